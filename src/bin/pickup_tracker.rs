//! pickup-tracker: journey state tracking service
//!
//! Serves the journey HTTP API over the configured store and delivers
//! guardian notifications in the background.
//!
//! ## Architecture
//! ```text
//! [Escort app] -> [HTTP API] -> [JourneyTracker] -> [JourneyStore]
//!                                      |
//!                                      v
//!                          [notification queue] -> [Notifier] -> [Guardian]
//! ```
//!
//! ## Configuration
//! - First argument: optional config file path
//! - PICKUP_CONFIG: config file path
//! - PICKUP__SECTION__KEY: override any config value
//! - PICKUP_LOG: log filter (default: info)

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use pickup_tracker::config::Config;
use pickup_tracker::handlers::{serve, AppState};
use pickup_tracker::journey::JourneyTracker;
use pickup_tracker::notify::init_notifications;
use pickup_tracker::storage::init_storage;
use pickup_tracker::utils::bootstrap::{drain_worker, init_tracing, shutdown_signal};

/// Time allowed for queued notifications to go out after shutdown.
const NOTIFICATION_DRAIN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        storage = %config.storage.storage_type,
        notifier = ?config.notifications.notifier_type,
        "starting pickup-tracker"
    );

    let (store, directory) = init_storage(&config.storage).await?;

    let (dispatcher, worker) = init_notifications(&config.notifications, directory.clone())?;

    let tracker = Arc::new(JourneyTracker::new(store).with_notifications(dispatcher));
    let state = AppState::new(tracker, directory);

    serve(state, &config.server, shutdown_signal())
        .await
        .map_err(|e| -> Box<dyn std::error::Error> { e })?;

    // The router and tracker hold the last dispatcher handles; once they are
    // gone the worker drains its queue and stops.
    drain_worker("notification worker", worker, NOTIFICATION_DRAIN_GRACE).await;

    info!("pickup-tracker stopped");
    Ok(())
}
