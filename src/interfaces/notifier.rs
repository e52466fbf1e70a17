//! Outbound guardian notification interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::journey::JourneyStatus;

/// Errors that can occur while delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("No delivery address for guardian {0}")]
    NoRecipient(String),

    #[error("Notification rejected: {0}")]
    Rejected(String),

    #[error("Notification service unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Directory lookup failed: {0}")]
    Directory(#[from] super::StorageError),

    #[error("Notifier configuration error: {0}")]
    Config(String),
}

impl NotifyError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            NotifyError::Unavailable(_) => true,
            NotifyError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// A message for a journey's guardian describing a recorded transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub journey_key: String,
    pub guardian_ref: String,
    pub status: JourneyStatus,
    pub recorded_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

/// Interface for delivering notifications to guardians.
///
/// Implementations:
/// - `LogNotifier`: writes to the tracing log
/// - `ExpoPushNotifier`: Expo push service over HTTP
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification to `guardian_ref`.
    async fn notify(&self, guardian_ref: &str, notification: &Notification)
        -> Result<(), NotifyError>;
}
