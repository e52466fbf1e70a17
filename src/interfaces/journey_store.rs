//! Journey event storage interface.

use async_trait::async_trait;

use crate::journey::JourneyEvent;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Sequence conflict on journey {journey_key}: expected {expected}, got {actual}")]
    SequenceConflict {
        journey_key: String,
        expected: u32,
        actual: u32,
    },

    #[error("Invalid stored status: {0}")]
    InvalidStatus(String),

    #[error("Invalid stored timestamp: {0}")]
    InvalidTimestamp(String),

    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unsupported storage: {0}")]
    Unsupported(String),
}

/// Interface for the append-only journey event log.
///
/// Implementations:
/// - `InMemoryJourneyStore`: process-local storage
/// - `SqliteJourneyStore`: SQLite storage
/// - `PostgresJourneyStore`: PostgreSQL storage
#[async_trait]
pub trait JourneyStore: Send + Sync {
    /// Append one event to its journey's log.
    ///
    /// `event.sequence` must equal the journey's next sequence (0 for a new
    /// journey). Otherwise nothing is written and `SequenceConflict` is
    /// returned.
    async fn append(&self, event: &JourneyEvent) -> Result<()>;

    /// The highest-sequence event for a journey, if any.
    async fn latest(&self, journey_key: &str) -> Result<Option<JourneyEvent>>;

    /// All events for a journey in sequence order.
    async fn events(&self, journey_key: &str) -> Result<Vec<JourneyEvent>>;

    /// The latest event of every journey. Order is backend-defined.
    async fn latest_per_journey(&self) -> Result<Vec<JourneyEvent>>;
}
