//! Pickup journey domain: statuses, events, the transition table and the
//! tracker that enforces it.

pub mod event;
pub mod flow;
pub mod locks;
pub mod status;
pub mod tracker;

pub use event::{JourneyEvent, JourneyHistory, JourneySummary, Parties};
pub use flow::{TransitionRejection, TransitionTable};
pub use status::{status_name, JourneyStatus, UnknownStatus, NONE_STATUS};
pub use tracker::{JourneyTracker, TrackerError, TransitionPayload};
