//! pickup-tracker - journey state tracking for child pickup and escort
//!
//! Records the status of each pickup journey as an append-only event log,
//! enforces the pending → departed → picked → arrived → completed flow, and
//! notifies the guardian as the journey progresses.

pub mod config;
pub mod handlers;
pub mod interfaces;
pub mod journey;
pub mod notify;
pub mod storage;
pub mod utils;
