//! Guardian notification configuration.

use serde::Deserialize;

/// Notifier discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierType {
    /// Write notifications to the log only.
    #[default]
    Log,
    /// Deliver through the Expo push service.
    Expo,
}

/// Notification configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    #[serde(rename = "type")]
    pub notifier_type: NotifierType,
    /// Pending notifications held before new ones are dropped.
    pub queue_capacity: usize,
    pub retry: RetrySettings,
    pub expo: ExpoConfig,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            notifier_type: NotifierType::Log,
            queue_capacity: 256,
            retry: RetrySettings::default(),
            expo: ExpoConfig::default(),
        }
    }
}

/// Delivery retry policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Retries after the first attempt.
    pub max_attempts: usize,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            min_delay_ms: 200,
            max_delay_ms: 10_000,
            max_attempts: 5,
        }
    }
}

/// Expo push service settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExpoConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub sound: String,
}

impl Default for ExpoConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://exp.host/--/api/v2/push/send".to_string(),
            timeout_secs: 10,
            sound: "default".to_string(),
        }
    }
}
