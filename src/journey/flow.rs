//! Journey transition table.
//!
//! The canonical flow is the 5-stage escort journey:
//!
//! ```text
//! none -> pending -> departed -> picked -> arrived -> completed
//! ```
//!
//! `cancelled` may follow any non-terminal status. `completed` and
//! `cancelled` are terminal.

use super::status::JourneyStatus;

/// (current, next) edges of the canonical flow. `None` is a journey with no events.
const CANONICAL_FLOW: &[(Option<JourneyStatus>, JourneyStatus)] = &[
    (None, JourneyStatus::Pending),
    (Some(JourneyStatus::Pending), JourneyStatus::Departed),
    (Some(JourneyStatus::Departed), JourneyStatus::Picked),
    (Some(JourneyStatus::Picked), JourneyStatus::Arrived),
    (Some(JourneyStatus::Arrived), JourneyStatus::Completed),
];

/// Why a requested status was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRejection {
    /// The journey already reached a terminal status.
    Finalized { current: JourneyStatus },
    /// A completed journey can never be cancelled.
    CancelCompleted,
    /// The requested status is not the single legal successor.
    OutOfOrder { expected: Option<JourneyStatus> },
}

/// Immutable lookup table mapping a current status to its single legal successor.
#[derive(Debug, Clone, Copy)]
pub struct TransitionTable {
    edges: &'static [(Option<JourneyStatus>, JourneyStatus)],
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::canonical()
    }
}

impl TransitionTable {
    pub const fn canonical() -> Self {
        Self {
            edges: CANONICAL_FLOW,
        }
    }

    /// The legal non-cancel successor of `current`, if any.
    pub fn next(&self, current: Option<JourneyStatus>) -> Option<JourneyStatus> {
        self.edges
            .iter()
            .find(|(from, _)| *from == current)
            .map(|(_, to)| *to)
    }

    /// Decide whether `requested` may be recorded after `current`.
    pub fn check(
        &self,
        current: Option<JourneyStatus>,
        requested: JourneyStatus,
    ) -> Result<(), TransitionRejection> {
        if requested == JourneyStatus::Cancelled {
            return match current {
                Some(JourneyStatus::Completed) => Err(TransitionRejection::CancelCompleted),
                Some(JourneyStatus::Cancelled) => Err(TransitionRejection::Finalized {
                    current: JourneyStatus::Cancelled,
                }),
                _ => Ok(()),
            };
        }

        if let Some(current) = current.filter(JourneyStatus::is_terminal) {
            return Err(TransitionRejection::Finalized { current });
        }

        let expected = self.next(current);
        if expected == Some(requested) {
            Ok(())
        } else {
            Err(TransitionRejection::OutOfOrder { expected })
        }
    }

    /// Whether `statuses`, applied in order from `none`, is accepted in full.
    pub fn is_valid_path(&self, statuses: &[JourneyStatus]) -> bool {
        let mut current = None;
        for status in statuses {
            if self.check(current, *status).is_err() {
                return false;
            }
            current = Some(*status);
        }
        true
    }
}
