//! Approval lifecycle of one table pair.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ApprovalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    #[default]
    NoSuggestion,
    Suggested,
    AwaitingApproval,
    Approved,
    Rejected,
}

impl ApprovalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSuggestion => "no suggestion",
            Self::Suggested => "suggested",
            Self::AwaitingApproval => "awaiting approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Applies `event`, returning the next state.
    ///
    /// A new suggestion resets any state. Review can be requested again after
    /// a decision; approving or rejecting requires a pending review.
    pub fn transition(self, event: ApprovalEvent) -> Result<Self, ApprovalError> {
        use ApprovalEvent as E;
        use ApprovalState as S;
        match (self, event) {
            (_, E::Suggest) => Ok(S::Suggested),
            (S::NoSuggestion, E::RequestApproval) => Err(ApprovalError::NoSuggestion),
            (S::Suggested | S::Approved | S::Rejected, E::RequestApproval) => {
                Ok(S::AwaitingApproval)
            }
            (S::AwaitingApproval, E::Approve) => Ok(S::Approved),
            (S::AwaitingApproval, E::Reject) => Ok(S::Rejected),
            (from, event) => Err(ApprovalError::InvalidTransition { from, event }),
        }
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalEvent {
    Suggest,
    RequestApproval,
    Approve,
    Reject,
}

impl fmt::Display for ApprovalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Suggest => "suggest",
            Self::RequestApproval => "request approval",
            Self::Approve => "approve",
            Self::Reject => "reject",
        })
    }
}
