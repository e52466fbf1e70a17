//! Journey event records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::JourneyStatus;

/// The parties a journey is about. Fixed by the journey's first event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parties {
    pub guardian_ref: String,
    pub child_ref: String,
    pub escort_ref: String,
}

/// One immutable status event in a journey's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyEvent {
    pub journey_key: String,
    /// Position in the journey's log, starting at 0.
    pub sequence: u32,
    #[serde(flatten)]
    pub parties: Parties,
    pub status: JourneyStatus,
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// All events of one journey in sequence order.
///
/// Finite and restartable: iterate it as many times as needed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct JourneyHistory {
    events: Vec<JourneyEvent>,
}

impl JourneyHistory {
    pub fn new(mut events: Vec<JourneyEvent>) -> Self {
        events.sort_by_key(|e| e.sequence);
        Self { events }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, JourneyEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn statuses(&self) -> Vec<JourneyStatus> {
        self.events.iter().map(|e| e.status).collect()
    }

    pub fn into_events(self) -> Vec<JourneyEvent> {
        self.events
    }
}

impl<'a> IntoIterator for &'a JourneyHistory {
    type Item = &'a JourneyEvent;
    type IntoIter = std::slice::Iter<'a, JourneyEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl IntoIterator for JourneyHistory {
    type Item = JourneyEvent;
    type IntoIter = std::vec::IntoIter<JourneyEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

/// Latest state of a journey, for detail and listing views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JourneySummary {
    pub journey_key: String,
    pub status: JourneyStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub parties: Parties,
    /// Number of events recorded for the journey.
    pub event_count: u32,
}

impl JourneySummary {
    /// Summarize from the latest event of a journey.
    pub fn from_latest(event: &JourneyEvent) -> Self {
        Self {
            journey_key: event.journey_key.clone(),
            status: event.status,
            timestamp: event.recorded_at,
            parties: event.parties.clone(),
            event_count: event.sequence + 1,
        }
    }
}
