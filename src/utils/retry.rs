//! Retry utilities: backoff builders for notification delivery.
//!
//! Uses `backon` for exponential backoff with jitter.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::config::RetrySettings;

/// Backoff for guardian notification delivery.
///
/// Delays grow from `min_delay_ms` up to `max_delay_ms`, with jitter, for at
/// most `max_attempts` retries after the first attempt.
pub fn notification_backoff(settings: &RetrySettings) -> ExponentialBuilder {
    let min_delay = Duration::from_millis(settings.min_delay_ms);
    let max_delay = Duration::from_millis(settings.max_delay_ms).max(min_delay);

    ExponentialBuilder::default()
        .with_min_delay(min_delay)
        .with_max_delay(max_delay)
        .with_max_times(settings.max_attempts)
        .with_jitter()
}
