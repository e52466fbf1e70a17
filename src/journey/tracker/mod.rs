//! Journey state tracker.
//!
//! Records status transitions for pickup journeys. Each call to
//! [`JourneyTracker::record_transition`] reads the journey's latest event,
//! checks the requested status against the transition table, and appends a
//! new event, all under that journey's lock. The store's compare-and-append
//! on sequence numbers covers writers in other processes.
//!
//! On every accepted transition a notification for the guardian is queued.
//! Queueing never blocks and its outcome never affects the transition.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::event::{JourneyEvent, JourneyHistory, JourneySummary, Parties};
use super::flow::{TransitionRejection, TransitionTable};
use super::locks::KeyedLocks;
use super::status::{status_name, JourneyStatus, UnknownStatus};
use crate::interfaces::{JourneyStore, StorageError};
use crate::notify::{messages, NotificationDispatcher};

/// Longest accepted journey key.
pub const MAX_KEY_LEN: usize = 128;

/// Errors returned by tracker operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{}", illegal_message(.current, .requested, .expected))]
    IllegalTransition {
        current: Option<JourneyStatus>,
        requested: JourneyStatus,
        expected: Option<JourneyStatus>,
    },

    #[error("Journey already finalized: cannot update status after journey is {current} (received {requested})")]
    Finalized {
        current: JourneyStatus,
        requested: JourneyStatus,
    },

    #[error("Journey not found: {0}")]
    NotFound(String),

    #[error("Concurrent update on journey {journey_key}, nothing was recorded")]
    Conflict { journey_key: String },

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

fn illegal_message(
    current: &Option<JourneyStatus>,
    requested: &JourneyStatus,
    expected: &Option<JourneyStatus>,
) -> String {
    if *requested == JourneyStatus::Cancelled && *current == Some(JourneyStatus::Completed) {
        return "Cannot cancel a completed journey".to_string();
    }
    format!(
        "Invalid status transition. Current: {}, expected: {}, received: {}",
        status_name(*current),
        status_name(*expected),
        requested
    )
}

impl From<StorageError> for TrackerError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::SequenceConflict { journey_key, .. } => {
                TrackerError::Conflict { journey_key }
            }
            other => TrackerError::Storage(other),
        }
    }
}

impl From<UnknownStatus> for TrackerError {
    fn from(e: UnknownStatus) -> Self {
        TrackerError::InvalidInput(e.to_string())
    }
}

impl TrackerError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TrackerError::InvalidInput(_) => "invalid_input",
            TrackerError::IllegalTransition { .. } => "illegal_transition",
            TrackerError::Finalized { .. } => "finalized",
            TrackerError::NotFound(_) => "not_found",
            TrackerError::Conflict { .. } => "conflict",
            TrackerError::Storage(_) => "storage_error",
        }
    }

    /// The journey's status at the time of a rejected transition.
    pub fn current_status(&self) -> Option<Option<JourneyStatus>> {
        match self {
            TrackerError::IllegalTransition { current, .. } => Some(*current),
            TrackerError::Finalized { current, .. } => Some(Some(*current)),
            _ => None,
        }
    }

    /// The single status that would have been accepted, if any.
    pub fn expected_next(&self) -> Option<JourneyStatus> {
        match self {
            TrackerError::IllegalTransition { expected, .. } => *expected,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;

/// Caller-supplied details accompanying a transition.
///
/// Party references are required on a journey's first event. Later events
/// inherit them; any that are supplied must match.
#[derive(Debug, Clone, Default)]
pub struct TransitionPayload {
    pub guardian_ref: Option<String>,
    pub child_ref: Option<String>,
    pub escort_ref: Option<String>,
    pub location: Option<String>,
}

impl TransitionPayload {
    pub fn with_parties(
        guardian_ref: impl Into<String>,
        child_ref: impl Into<String>,
        escort_ref: impl Into<String>,
    ) -> Self {
        Self {
            guardian_ref: Some(guardian_ref.into()),
            child_ref: Some(child_ref.into()),
            escort_ref: Some(escort_ref.into()),
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Validates and records journey status transitions.
pub struct JourneyTracker {
    store: Arc<dyn JourneyStore>,
    table: TransitionTable,
    locks: KeyedLocks,
    notifications: Option<NotificationDispatcher>,
}

impl JourneyTracker {
    /// Create a tracker over `store` using the canonical transition table.
    pub fn new(store: Arc<dyn JourneyStore>) -> Self {
        Self {
            store,
            table: TransitionTable::canonical(),
            locks: KeyedLocks::new(),
            notifications: None,
        }
    }

    /// Queue a guardian notification for every accepted transition.
    pub fn with_notifications(mut self, dispatcher: NotificationDispatcher) -> Self {
        self.notifications = Some(dispatcher);
        self
    }

    pub fn transition_table(&self) -> &TransitionTable {
        &self.table
    }

    /// Validate and record `requested` as the next status of `journey_key`.
    ///
    /// Returns the stored event. Rejections append nothing.
    #[tracing::instrument(name = "tracker.record", skip(self, payload))]
    pub async fn record_transition(
        &self,
        journey_key: &str,
        requested: JourneyStatus,
        payload: TransitionPayload,
    ) -> Result<JourneyEvent> {
        let journey_key = validate_key(journey_key)?;
        let payload = normalize(payload);

        let _guard = self.locks.lock(journey_key).await;

        let latest = self.store.latest(journey_key).await?;
        let current = latest.as_ref().map(|e| e.status);
        let parties = resolve_parties(latest.as_ref(), &payload)?;

        if let Err(rejection) = self.table.check(current, requested) {
            let err = rejection_error(rejection, current, requested);
            debug!(
                journey_key,
                current = status_name(current),
                error = %err,
                "transition rejected"
            );
            return Err(err);
        }

        let now = Utc::now();
        let (sequence, recorded_at) = match &latest {
            Some(prior) => (prior.sequence + 1, now.max(prior.recorded_at)),
            None => (0, now),
        };

        let event = JourneyEvent {
            journey_key: journey_key.to_string(),
            sequence,
            parties,
            status: requested,
            recorded_at,
            location: payload.location,
        };

        self.store.append(&event).await?;

        info!(
            journey_key,
            sequence,
            from = status_name(current),
            to = %requested,
            "transition recorded"
        );

        // Still under the journey lock, so the queue sees this journey's
        // notifications in recording order.
        if let Some(dispatcher) = &self.notifications {
            dispatcher.submit(messages::notification_for(&event));
        }

        Ok(event)
    }

    /// Current status of a journey, `None` if it has no events.
    pub async fn current_status(&self, journey_key: &str) -> Result<Option<JourneyStatus>> {
        Ok(self.latest_event(journey_key).await?.map(|e| e.status))
    }

    /// Latest event of a journey, `None` if it has no events.
    pub async fn latest_event(&self, journey_key: &str) -> Result<Option<JourneyEvent>> {
        let journey_key = validate_key(journey_key)?;
        Ok(self.store.latest(journey_key).await?)
    }

    /// All events of a journey in recording order. Empty for an unknown key.
    pub async fn history(&self, journey_key: &str) -> Result<JourneyHistory> {
        let journey_key = validate_key(journey_key)?;
        let events = self.store.events(journey_key).await?;
        Ok(JourneyHistory::new(events))
    }

    /// Summary of an existing journey.
    pub async fn journey(&self, journey_key: &str) -> Result<JourneySummary> {
        self.latest_event(journey_key)
            .await?
            .map(|e| JourneySummary::from_latest(&e))
            .ok_or_else(|| TrackerError::NotFound(journey_key.trim().to_string()))
    }

    /// Summaries of every journey, ordered by journey key.
    pub async fn list_journeys(&self) -> Result<Vec<JourneySummary>> {
        let mut latest = self.store.latest_per_journey().await?;
        latest.sort_by(|a, b| a.journey_key.cmp(&b.journey_key));
        Ok(latest.iter().map(JourneySummary::from_latest).collect())
    }
}

fn validate_key(journey_key: &str) -> Result<&str> {
    let key = journey_key.trim();
    if key.is_empty() {
        return Err(TrackerError::InvalidInput(
            "journey_key is required".to_string(),
        ));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(TrackerError::InvalidInput(format!(
            "journey_key exceeds {} characters",
            MAX_KEY_LEN
        )));
    }
    Ok(key)
}

/// Blank strings count as absent.
fn normalize(payload: TransitionPayload) -> TransitionPayload {
    fn clean(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    TransitionPayload {
        guardian_ref: clean(payload.guardian_ref),
        child_ref: clean(payload.child_ref),
        escort_ref: clean(payload.escort_ref),
        location: clean(payload.location),
    }
}

fn rejection_error(
    rejection: TransitionRejection,
    current: Option<JourneyStatus>,
    requested: JourneyStatus,
) -> TrackerError {
    match rejection {
        TransitionRejection::Finalized { current } => TrackerError::Finalized { current, requested },
        TransitionRejection::CancelCompleted => TrackerError::IllegalTransition {
            current,
            requested,
            expected: None,
        },
        TransitionRejection::OutOfOrder { expected } => TrackerError::IllegalTransition {
            current,
            requested,
            expected,
        },
    }
}

fn resolve_parties(latest: Option<&JourneyEvent>, payload: &TransitionPayload) -> Result<Parties> {
    let fields = [
        ("guardian_ref", &payload.guardian_ref),
        ("child_ref", &payload.child_ref),
        ("escort_ref", &payload.escort_ref),
    ];

    match latest {
        None => {
            for (name, value) in fields {
                if value.is_none() {
                    return Err(TrackerError::InvalidInput(format!(
                        "{} is required for the first event of a journey",
                        name
                    )));
                }
            }
            Ok(Parties {
                guardian_ref: payload.guardian_ref.clone().unwrap_or_default(),
                child_ref: payload.child_ref.clone().unwrap_or_default(),
                escort_ref: payload.escort_ref.clone().unwrap_or_default(),
            })
        }
        Some(prior) => {
            let known = [
                &prior.parties.guardian_ref,
                &prior.parties.child_ref,
                &prior.parties.escort_ref,
            ];
            for ((name, supplied), known) in fields.into_iter().zip(known) {
                if let Some(supplied) = supplied {
                    if supplied != known {
                        return Err(TrackerError::InvalidInput(format!(
                            "{} does not match the journey's {}",
                            name, name
                        )));
                    }
                }
            }
            Ok(prior.parties.clone())
        }
    }
}

#[cfg(test)]
mod tests;
