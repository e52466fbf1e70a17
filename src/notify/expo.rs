//! Expo push notifier.
//!
//! Resolves the guardian's registered device token and POSTs a push message
//! to the Expo push service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ExpoConfig;
use crate::interfaces::{GuardianDirectory, Notification, Notifier, NotifyError};

/// Expo push notifier configuration.
#[derive(Debug, Clone)]
pub struct ExpoPushConfig {
    /// Push API endpoint URL.
    pub endpoint: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Sound played on the device.
    pub sound: String,
}

impl Default for ExpoPushConfig {
    fn default() -> Self {
        Self::from(&ExpoConfig::default())
    }
}

impl From<&ExpoConfig> for ExpoPushConfig {
    fn from(config: &ExpoConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            sound: config.sound.clone(),
        }
    }
}

impl ExpoPushConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Serialize)]
struct PushMessage<'a> {
    to: &'a str,
    sound: &'a str,
    title: &'a str,
    body: &'a str,
    data: PushData<'a>,
}

#[derive(Serialize)]
struct PushData<'a> {
    journey_key: &'a str,
    status: &'a str,
}

#[derive(Deserialize)]
struct PushResponse {
    data: Option<PushTicket>,
}

#[derive(Deserialize)]
struct PushTicket {
    status: String,
    message: Option<String>,
}

/// Notifier delivering through the Expo push service.
pub struct ExpoPushNotifier {
    client: Client,
    config: ExpoPushConfig,
    directory: Arc<dyn GuardianDirectory>,
}

impl ExpoPushNotifier {
    pub fn new(
        config: ExpoPushConfig,
        directory: Arc<dyn GuardianDirectory>,
    ) -> Result<Self, NotifyError> {
        if config.endpoint.is_empty() {
            return Err(NotifyError::Config("Expo endpoint not configured".to_string()));
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            config,
            directory,
        })
    }

    /// 429 and 5xx are worth another attempt.
    fn is_retryable_status(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }
}

#[async_trait]
impl Notifier for ExpoPushNotifier {
    async fn notify(
        &self,
        guardian_ref: &str,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        let token = self
            .directory
            .push_token(guardian_ref)
            .await?
            .ok_or_else(|| NotifyError::NoRecipient(guardian_ref.to_string()))?;

        let message = PushMessage {
            to: &token,
            sound: &self.config.sound,
            title: &notification.title,
            body: &notification.body,
            data: PushData {
                journey_key: &notification.journey_key,
                status: notification.status.as_str(),
            },
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = format!(
                "HTTP {} - {}",
                status,
                body.chars().take(200).collect::<String>()
            );
            return if Self::is_retryable_status(status) {
                Err(NotifyError::Unavailable(detail))
            } else {
                Err(NotifyError::Rejected(detail))
            };
        }

        let parsed: PushResponse = response.json().await?;
        match parsed.data {
            Some(ticket) if ticket.status == "error" => Err(NotifyError::Rejected(
                ticket.message.unwrap_or_else(|| "push ticket error".to_string()),
            )),
            _ => {
                debug!(
                    guardian_ref,
                    journey_key = %notification.journey_key,
                    "push notification accepted"
                );
                Ok(())
            }
        }
    }
}
