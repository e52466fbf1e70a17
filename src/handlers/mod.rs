//! HTTP API for recording and querying journeys.

pub mod rest;

pub use rest::{router, serve, AppState};
