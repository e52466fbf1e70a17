//! Journey status values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Wire name for the synthetic status of a journey with no events.
pub const NONE_STATUS: &str = "none";

/// A recorded journey status.
///
/// A journey with no events has no `JourneyStatus`; callers represent that as
/// `Option::None` and render it as [`NONE_STATUS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JourneyStatus {
    Pending,
    Departed,
    Picked,
    #[serde(alias = "dropoff")]
    Arrived,
    Completed,
    Cancelled,
}

impl JourneyStatus {
    pub const ALL: [JourneyStatus; 6] = [
        JourneyStatus::Pending,
        JourneyStatus::Departed,
        JourneyStatus::Picked,
        JourneyStatus::Arrived,
        JourneyStatus::Completed,
        JourneyStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JourneyStatus::Pending => "pending",
            JourneyStatus::Departed => "departed",
            JourneyStatus::Picked => "picked",
            JourneyStatus::Arrived => "arrived",
            JourneyStatus::Completed => "completed",
            JourneyStatus::Cancelled => "cancelled",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JourneyStatus::Completed | JourneyStatus::Cancelled)
    }
}

impl fmt::Display for JourneyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status name is not part of the status set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown journey status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for JourneyStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(JourneyStatus::Pending),
            "departed" => Ok(JourneyStatus::Departed),
            "picked" => Ok(JourneyStatus::Picked),
            "arrived" | "dropoff" => Ok(JourneyStatus::Arrived),
            "completed" => Ok(JourneyStatus::Completed),
            "cancelled" => Ok(JourneyStatus::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Render an optional status, using [`NONE_STATUS`] for a journey with no events.
pub fn status_name(status: Option<JourneyStatus>) -> &'static str {
    status.map(|s| s.as_str()).unwrap_or(NONE_STATUS)
}
