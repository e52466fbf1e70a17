//! Shared row mapping for SQL journey stores.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::interfaces::{Result, StorageError};
use crate::journey::{JourneyEvent, JourneyStatus, Parties};

/// Raw journey event row as read from SQL.
#[derive(Debug, sqlx::FromRow)]
pub struct EventRow {
    pub journey_key: String,
    pub sequence: i64,
    pub guardian_ref: String,
    pub child_ref: String,
    pub escort_ref: String,
    pub status: String,
    pub recorded_at: String,
    pub location: Option<String>,
}

impl EventRow {
    pub fn into_event(self) -> Result<JourneyEvent> {
        let status: JourneyStatus = self
            .status
            .parse()
            .map_err(|_| StorageError::InvalidStatus(self.status.clone()))?;

        let recorded_at = DateTime::parse_from_rfc3339(&self.recorded_at)
            .map_err(|_| StorageError::InvalidTimestamp(self.recorded_at.clone()))?
            .with_timezone(&Utc);

        let sequence = u32::try_from(self.sequence)
            .map_err(|_| StorageError::InvalidStatus(format!("sequence {}", self.sequence)))?;

        Ok(JourneyEvent {
            journey_key: self.journey_key,
            sequence,
            parties: Parties {
                guardian_ref: self.guardian_ref,
                child_ref: self.child_ref,
                escort_ref: self.escort_ref,
            },
            status,
            recorded_at,
            location: self.location,
        })
    }
}

/// Fixed-width UTC timestamp, so text ordering matches time ordering.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn rows_to_events(rows: Vec<EventRow>) -> Result<Vec<JourneyEvent>> {
    rows.into_iter().map(EventRow::into_event).collect()
}

/// Whether a database error is a primary-key collision.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
