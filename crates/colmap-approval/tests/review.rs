use std::thread;
use std::time::Duration;

use colmap_approval::{
    PendingReview, RejectReason, ReviewChannel, ReviewDecision, ReviewOutcome, ReviewPayload,
    ReviewRequest, ScriptedReviewer, review_channel,
};
use colmap_guard::{ConfidenceThresholds, RiskContext, analyze_confidence, assess_risk};
use colmap_model::{MappingCandidate, MappingSet, RiskOperation};
use uuid::Uuid;

fn request() -> ReviewRequest {
    let set = MappingSet::new(
        "cust_src",
        "customer",
        vec![MappingCandidate::unmapped("customer_status", "STRING")],
    );
    let payload = ReviewPayload::build(
        &set,
        assess_risk(RiskOperation::MappingApprove, &RiskContext::mapping(0.0, 1)),
        analyze_confidence(&set, &ConfidenceThresholds::default()),
        Vec::new(),
    );
    ReviewRequest::new(payload)
}

#[test]
fn desk_decision_reaches_requester() {
    let (broker, desk) = review_channel();
    let reviewer = thread::spawn(move || {
        let ticket = desk.next().expect("ticket");
        assert!(ticket.request.hint.contains("customer_status"));
        ticket.approve();
    });

    let pending = broker.submit(request()).expect("submit");
    let outcome = pending.wait(Some(Duration::from_secs(5)));
    assert_eq!(outcome, ReviewOutcome::Approved { note: None });
    reviewer.join().expect("reviewer thread");
}

#[test]
fn desk_rejection_carries_note() {
    let (broker, desk) = review_channel();
    let reviewer = thread::spawn(move || {
        for ticket in desk.tickets() {
            ticket.reject("status needs a default");
        }
    });
    let outcome = broker
        .submit(request())
        .expect("submit")
        .wait(Some(Duration::from_secs(5)));
    assert_eq!(
        outcome,
        ReviewOutcome::Rejected {
            reason: RejectReason::Declined,
            note: Some("status needs a default".to_string()),
        }
    );
    drop(broker);
    reviewer.join().expect("reviewer thread");
}

#[test]
fn timeout_counts_as_rejection() {
    let reviewer = ScriptedReviewer::silent();
    let outcome = reviewer
        .submit(request())
        .expect("submit")
        .wait(Some(Duration::from_millis(20)));
    assert!(matches!(
        outcome,
        ReviewOutcome::Rejected {
            reason: RejectReason::TimedOut,
            ..
        }
    ));
    assert_eq!(reviewer.requests().len(), 1);
}

#[test]
fn reviewer_hanging_up_counts_as_rejection() {
    let (broker, desk) = review_channel();
    drop(desk);
    assert!(broker.submit(request()).is_err());

    let (broker, desk) = review_channel();
    let pending = broker.submit(request()).expect("submit");
    // Ticket taken and dropped without a decision.
    drop(desk.next());
    let outcome = pending.wait(None);
    assert!(matches!(
        outcome,
        ReviewOutcome::Rejected {
            reason: RejectReason::ReviewerGone,
            ..
        }
    ));
}

#[test]
fn mismatched_correlation_id_is_ignored() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let expected = Uuid::new_v4();
    tx.send(ReviewDecision {
        correlation_id: Uuid::new_v4(),
        approved: true,
        note: None,
    })
    .expect("send");
    tx.send(ReviewDecision {
        correlation_id: expected,
        approved: false,
        note: None,
    })
    .expect("send");
    let outcome = PendingReview::new(expected, rx).wait(Some(Duration::from_secs(1)));
    assert!(!outcome.is_approved());
}

#[test]
fn scripted_approval() {
    let reviewer = ScriptedReviewer::approve_all();
    let outcome = reviewer.submit(request()).expect("submit").wait(None);
    assert!(outcome.is_approved());
}
