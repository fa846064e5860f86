//! Human approval of suggested mappings.
//!
//! A pair moves through [`ApprovalState`]; review happens in two phases:
//! [`ReviewChannel::submit`] hands a [`ReviewRequest`] to a reviewer and
//! [`PendingReview::wait`] blocks for the matching decision.

#![deny(unsafe_code)]

mod channel;
mod error;
mod payload;
mod state;

pub use channel::{
    DEFAULT_REVIEW_TIMEOUT, PendingReview, RejectReason, ReviewBroker, ReviewChannel,
    ReviewDecision, ReviewDesk, ReviewOutcome, ReviewRequest, ReviewTicket, ScriptedReviewer,
    review_channel,
};
pub use error::ApprovalError;
pub use payload::{ReviewPayload, ReviewRow, ReviewSummary, format_confidence};
pub use state::{ApprovalEvent, ApprovalState};
