//! PostgreSQL implementations of storage interfaces.

mod journey_store;

pub use journey_store::PostgresJourneyStore;
