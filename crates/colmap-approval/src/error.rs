use thiserror::Error;

use crate::state::{ApprovalEvent, ApprovalState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    #[error("no suggestion to review")]
    NoSuggestion,

    #[error("cannot {event} while {from}")]
    InvalidTransition {
        from: ApprovalState,
        event: ApprovalEvent,
    },

    #[error("reviewer is not connected")]
    ReviewerUnavailable,
}
