//! Abstract interfaces for tracker collaborators.
//!
//! These traits define the contracts for:
//! - Journey event storage (append-only persistence)
//! - Guardian directory (push-token lookup)
//! - Notifier (outbound guardian messages)

pub mod guardian_directory;
pub mod journey_store;
pub mod notifier;

pub use guardian_directory::GuardianDirectory;
pub use journey_store::{JourneyStore, Result, StorageError};
pub use notifier::{Notification, Notifier, NotifyError};
