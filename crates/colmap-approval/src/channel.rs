//! Two-phase review transport.
//!
//! The broker side implements [`ReviewChannel`]; a [`ReviewDesk`] owned by
//! whoever drives the human reviewer receives [`ReviewTicket`]s and answers
//! them. Decisions travel back on a per-request channel and are matched by
//! correlation id.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApprovalError;
use crate::payload::ReviewPayload;

/// How long a review may stay unanswered before it counts as rejected.
pub const DEFAULT_REVIEW_TIMEOUT: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub correlation_id: Uuid,
    pub hint: String,
    pub payload: ReviewPayload,
}

impl ReviewRequest {
    pub fn new(payload: ReviewPayload) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            hint: payload.hint(),
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub correlation_id: Uuid,
    pub approved: bool,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Declined,
    TimedOut,
    ReviewerGone,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Declined => "declined by reviewer",
            Self::TimedOut => "review timed out",
            Self::ReviewerGone => "reviewer disconnected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    Approved { note: Option<String> },
    Rejected { reason: RejectReason, note: Option<String> },
}

impl ReviewOutcome {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }
}

/// Sends review requests to a reviewer.
pub trait ReviewChannel {
    fn submit(&self, request: ReviewRequest) -> Result<PendingReview, ApprovalError>;
}

/// Handle for a submitted request.
#[derive(Debug)]
pub struct PendingReview {
    correlation_id: Uuid,
    decisions: Receiver<ReviewDecision>,
}

impl PendingReview {
    pub fn new(correlation_id: Uuid, decisions: Receiver<ReviewDecision>) -> Self {
        Self {
            correlation_id,
            decisions,
        }
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Blocks until the matching decision arrives. Decisions for other
    /// requests are discarded. `None` waits indefinitely.
    pub fn wait(self, timeout: Option<Duration>) -> ReviewOutcome {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let received = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    self.decisions.recv_timeout(remaining)
                }
                None => self
                    .decisions
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(decision) if decision.correlation_id != self.correlation_id => {
                    warn!(
                        expected = %self.correlation_id,
                        received = %decision.correlation_id,
                        "discarding decision for another review"
                    );
                }
                Ok(decision) if decision.approved => {
                    return ReviewOutcome::Approved {
                        note: decision.note,
                    };
                }
                Ok(decision) => {
                    return ReviewOutcome::Rejected {
                        reason: RejectReason::Declined,
                        note: decision.note,
                    };
                }
                Err(RecvTimeoutError::Timeout) => {
                    return ReviewOutcome::Rejected {
                        reason: RejectReason::TimedOut,
                        note: None,
                    };
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return ReviewOutcome::Rejected {
                        reason: RejectReason::ReviewerGone,
                        note: None,
                    };
                }
            }
        }
    }
}

/// A request delivered to the desk with its reply route.
#[derive(Debug)]
pub struct ReviewTicket {
    pub request: ReviewRequest,
    reply: Sender<ReviewDecision>,
}

impl ReviewTicket {
    pub fn decide(self, approved: bool, note: Option<String>) {
        let decision = ReviewDecision {
            correlation_id: self.request.correlation_id,
            approved,
            note,
        };
        // The requester may have timed out and hung up.
        if self.reply.send(decision).is_err() {
            debug!(
                correlation_id = %self.request.correlation_id,
                "decision arrived after requester stopped waiting"
            );
        }
    }

    pub fn approve(self) {
        self.decide(true, None);
    }

    pub fn reject(self, note: impl Into<String>) {
        self.decide(false, Some(note.into()));
    }
}

/// Broker half of an in-process review channel.
#[derive(Debug, Clone)]
pub struct ReviewBroker {
    tickets: Sender<ReviewTicket>,
}

/// Reviewer half of an in-process review channel.
#[derive(Debug)]
pub struct ReviewDesk {
    tickets: Receiver<ReviewTicket>,
}

pub fn review_channel() -> (ReviewBroker, ReviewDesk) {
    let (tx, rx) = unbounded();
    (ReviewBroker { tickets: tx }, ReviewDesk { tickets: rx })
}

impl ReviewChannel for ReviewBroker {
    fn submit(&self, request: ReviewRequest) -> Result<PendingReview, ApprovalError> {
        let correlation_id = request.correlation_id;
        let (reply, decisions) = bounded(1);
        self.tickets
            .send(ReviewTicket { request, reply })
            .map_err(|_| ApprovalError::ReviewerUnavailable)?;
        debug!(%correlation_id, "review submitted");
        Ok(PendingReview::new(correlation_id, decisions))
    }
}

impl ReviewDesk {
    /// Next ticket, or `None` once every broker is dropped.
    pub fn next(&self) -> Option<ReviewTicket> {
        self.tickets.recv().ok()
    }

    pub fn next_timeout(&self, timeout: Duration) -> Option<ReviewTicket> {
        self.tickets.recv_timeout(timeout).ok()
    }

    /// Iterates tickets until every broker is dropped.
    pub fn tickets(&self) -> impl Iterator<Item = ReviewTicket> + '_ {
        self.tickets.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Approve,
    Reject,
    Silent,
}

/// Reviewer that answers every request the same way without blocking a
/// human. `silent` never answers, so waits run into their timeout.
#[derive(Debug)]
pub struct ScriptedReviewer {
    script: Script,
    seen: Mutex<Vec<ReviewRequest>>,
    held: Mutex<Vec<Sender<ReviewDecision>>>,
}

impl ScriptedReviewer {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            seen: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
        }
    }

    pub fn approve_all() -> Self {
        Self::with_script(Script::Approve)
    }

    pub fn reject_all() -> Self {
        Self::with_script(Script::Reject)
    }

    pub fn silent() -> Self {
        Self::with_script(Script::Silent)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ReviewRequest> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

impl ReviewChannel for ScriptedReviewer {
    fn submit(&self, request: ReviewRequest) -> Result<PendingReview, ApprovalError> {
        let correlation_id = request.correlation_id;
        let (reply, decisions) = bounded(1);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request);
        }
        let approved = match self.script {
            Script::Approve => true,
            Script::Reject => false,
            Script::Silent => {
                if let Ok(mut held) = self.held.lock() {
                    held.push(reply);
                }
                return Ok(PendingReview::new(correlation_id, decisions));
            }
        };
        reply
            .send(ReviewDecision {
                correlation_id,
                approved,
                note: (!approved).then(|| "rejected by script".to_string()),
            })
            .map_err(|_| ApprovalError::ReviewerUnavailable)?;
        Ok(PendingReview::new(correlation_id, decisions))
    }
}
