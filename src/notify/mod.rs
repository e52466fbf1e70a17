//! Guardian notification delivery.
//!
//! Accepted transitions are submitted to a bounded queue drained by a single
//! background worker. One worker means notifications are attempted in the
//! order they were submitted, which for a given journey is the order its
//! transitions were recorded.
//!
//! Each delivery is retried with exponential backoff while the error is
//! retryable. Final failures are logged and dropped; they never reach the
//! caller that recorded the transition.

use std::sync::Arc;

use backon::{ExponentialBuilder, Retryable};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::{NotificationsConfig, NotifierType};
use crate::interfaces::{GuardianDirectory, Notification, Notifier, NotifyError};
use crate::utils::retry::notification_backoff;

pub mod expo;
pub mod log;
pub mod messages;
pub mod mock;

pub use expo::{ExpoPushConfig, ExpoPushNotifier};
pub use log::LogNotifier;
pub use mock::RecordingNotifier;

/// Handle for submitting notifications to the delivery worker.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<Notification>,
}

impl NotificationDispatcher {
    /// Start a delivery worker for `notifier`.
    ///
    /// The worker runs until every dispatcher handle is dropped and the queue
    /// is drained. Await the returned handle to flush on shutdown.
    pub fn spawn(
        notifier: Arc<dyn Notifier>,
        capacity: usize,
        backoff: ExponentialBuilder,
    ) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<Notification>(capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(notification) = receiver.recv().await {
                deliver(notifier.as_ref(), &notification, backoff.clone()).await;
            }
            debug!("notification queue closed, worker stopping");
        });

        (Self { sender }, handle)
    }

    /// Queue a notification without waiting.
    ///
    /// A full or closed queue drops the notification with a warning.
    pub fn submit(&self, notification: Notification) {
        match self.sender.try_send(notification) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(n)) => {
                warn!(
                    journey_key = %n.journey_key,
                    status = %n.status,
                    "notification queue full, dropping notification"
                );
            }
            Err(mpsc::error::TrySendError::Closed(n)) => {
                warn!(
                    journey_key = %n.journey_key,
                    status = %n.status,
                    "notification worker stopped, dropping notification"
                );
            }
        }
    }
}

async fn deliver(notifier: &dyn Notifier, notification: &Notification, backoff: ExponentialBuilder) {
    let result = (|| async {
        notifier
            .notify(&notification.guardian_ref, notification)
            .await
    })
    .retry(backoff)
    .when(NotifyError::is_retryable)
    .notify(|err: &NotifyError, delay| {
        warn!(
            journey_key = %notification.journey_key,
            error = %err,
            retry_in = ?delay,
            "notification delivery failed, retrying"
        );
    })
    .await;

    match result {
        Ok(()) => debug!(
            journey_key = %notification.journey_key,
            status = %notification.status,
            "notification delivered"
        ),
        Err(e) => error!(
            journey_key = %notification.journey_key,
            guardian_ref = %notification.guardian_ref,
            status = %notification.status,
            error = %e,
            "notification delivery failed"
        ),
    }
}

/// Build the configured notifier.
pub fn init_notifier(
    config: &NotificationsConfig,
    directory: Arc<dyn GuardianDirectory>,
) -> Result<Arc<dyn Notifier>, NotifyError> {
    match config.notifier_type {
        NotifierType::Log => Ok(Arc::new(LogNotifier::new())),
        NotifierType::Expo => {
            let expo = ExpoPushConfig::from(&config.expo);
            Ok(Arc::new(ExpoPushNotifier::new(expo, directory)?))
        }
    }
}

/// Build the configured notifier and start its delivery worker.
pub fn init_notifications(
    config: &NotificationsConfig,
    directory: Arc<dyn GuardianDirectory>,
) -> Result<(NotificationDispatcher, JoinHandle<()>), NotifyError> {
    let notifier = init_notifier(config, directory)?;
    Ok(NotificationDispatcher::spawn(
        notifier,
        config.queue_capacity,
        notification_backoff(&config.retry),
    ))
}
