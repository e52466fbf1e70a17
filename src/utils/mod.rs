//! Process bootstrap and retry policy helpers.

pub mod bootstrap;
pub mod retry;
