//! Notifier that writes guardian notifications to the tracing log.
//!
//! Used when no push provider is configured, and for local development.

use async_trait::async_trait;
use tracing::info;

use crate::interfaces::{Notification, Notifier, NotifyError};

#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        guardian_ref: &str,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        info!(
            guardian_ref,
            journey_key = %notification.journey_key,
            status = %notification.status,
            title = %notification.title,
            body = %notification.body,
            "guardian notification"
        );
        Ok(())
    }
}
