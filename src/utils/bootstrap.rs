//! Bootstrap utilities for the pickup-tracker binary.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

/// Initialize tracing with PICKUP_LOG environment variable.
///
/// Defaults to "info" level if PICKUP_LOG is not set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves when the process receives Ctrl-C.
pub fn shutdown_signal() -> impl Future<Output = ()> {
    async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
    }
}

/// Wait for a background worker to finish, giving up after `grace`.
pub async fn drain_worker(name: &str, handle: JoinHandle<()>, grace: Duration) {
    match tokio::time::timeout(grace, handle).await {
        Ok(Ok(())) => info!("{} drained", name),
        Ok(Err(e)) => warn!("{} stopped abnormally: {}", name, e),
        Err(_) => warn!("{} did not drain within {:?}", name, grace),
    }
}
