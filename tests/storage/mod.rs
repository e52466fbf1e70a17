//! Shared storage integration tests.
//!
//! Tests the JourneyStore and GuardianDirectory interfaces against all
//! implementations. Each implementation module imports these test functions
//! and runs them.

pub mod guardian_directory_tests;
pub mod journey_store_tests;
