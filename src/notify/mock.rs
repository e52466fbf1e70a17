//! Recording notifier for testing.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::interfaces::{Notification, Notifier, NotifyError};

/// Scripted outcome for one delivery attempt.
#[derive(Debug, Clone)]
pub enum Attempt {
    Unavailable,
    NoRecipient,
}

/// Notifier that records every delivered notification.
///
/// Failures can be scripted per attempt, and a delay can be added to each
/// delivery to observe that callers never wait on it.
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: RwLock<Vec<Notification>>,
    script: RwLock<VecDeque<Attempt>>,
    attempts: RwLock<u32>,
    delay: RwLock<Option<Duration>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next attempts in order before succeeding again.
    pub async fn script_failures(&self, attempts: impl IntoIterator<Item = Attempt>) {
        self.script.write().await.extend(attempts);
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    pub async fn delivered(&self) -> Vec<Notification> {
        self.delivered.read().await.clone()
    }

    pub async fn attempts(&self) -> u32 {
        *self.attempts.read().await
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        guardian_ref: &str,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        *self.attempts.write().await += 1;

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.script.write().await.pop_front();
        match scripted {
            Some(Attempt::Unavailable) => Err(NotifyError::Unavailable(
                "scripted outage".to_string(),
            )),
            Some(Attempt::NoRecipient) => Err(NotifyError::NoRecipient(guardian_ref.to_string())),
            None => {
                self.delivered.write().await.push(notification.clone());
                Ok(())
            }
        }
    }
}
