//! Console review desk and terminal tables.

use std::io::Cursor;
use std::thread;
use std::time::Duration;

use colmap_approval::{
    RejectReason, ReviewChannel, ReviewOutcome, ReviewPayload, ReviewRequest, review_channel,
};
use colmap_cli::review::{Answer, parse_answer, serve_desk};
use colmap_cli::summary::{mapping_overview, mapping_table, schema_table};
use colmap_guard::{ConfidenceThresholds, RiskContext, analyze_confidence, assess_risk};
use colmap_map::MappingEngine;
use colmap_model::{MappingSet, RiskOperation, SchemaSnapshot, TableSchema};

fn customer_set() -> MappingSet {
    let source =
        TableSchema::from_pairs("cust_src", &[("cust_id", "INT64"), ("cust_name", "STRING")])
            .unwrap();
    let target = TableSchema::from_pairs(
        "customer",
        &[
            ("customer_id", "INT64"),
            ("customer_name", "STRING"),
            ("customer_status", "STRING"),
        ],
    )
    .unwrap();
    MappingEngine::default().infer(&source, &target)
}

fn request() -> ReviewRequest {
    let set = customer_set();
    let engine = MappingEngine::default();
    ReviewRequest::new(ReviewPayload::build(
        &set,
        assess_risk(
            RiskOperation::MappingApprove,
            &RiskContext::mapping(set.stats.average_confidence, set.stats.unmapped_count),
        ),
        analyze_confidence(&set, &ConfidenceThresholds::default()),
        engine.explain_all(&set),
    ))
}

/// Submits one request from a helper thread and serves it with `input`.
fn review_with(input: &str) -> (ReviewOutcome, String, usize) {
    let (broker, desk) = review_channel();
    let requester = thread::spawn(move || {
        let pending = broker.submit(request()).expect("submit");
        drop(broker);
        pending.wait(Some(Duration::from_secs(5)))
    });
    let mut output = Vec::new();
    let decided = serve_desk(&desk, Cursor::new(input.to_string()), &mut output).expect("serve");
    drop(desk);
    let outcome = requester.join().expect("requester thread");
    (outcome, String::from_utf8(output).expect("utf8"), decided)
}

#[test]
fn answers_are_parsed_leniently() {
    assert_eq!(parse_answer("y\n"), Some(Answer::Approve));
    assert_eq!(parse_answer("  YES "), Some(Answer::Approve));
    assert_eq!(parse_answer(""), Some(Answer::Reject(None)));
    assert_eq!(
        parse_answer("n wrong key column"),
        Some(Answer::Reject(Some("wrong key column".to_string())))
    );
    assert_eq!(parse_answer("maybe"), None);
}

#[test]
fn console_approval_reaches_requester() {
    let (outcome, output, decided) = review_with("maybe\ny\n");
    assert_eq!(outcome, ReviewOutcome::Approved { note: None });
    assert_eq!(decided, 1);
    assert!(output.contains("Approve column mappings: cust_src -> customer"));
    assert!(output.contains("customer_status: no source column matched"));
    assert!(output.contains("Please answer y or n."));
}

#[test]
fn console_rejection_carries_note() {
    let (outcome, _output, _) = review_with("reject status needs a default\n");
    assert_eq!(
        outcome,
        ReviewOutcome::Rejected {
            reason: RejectReason::Declined,
            note: Some("status needs a default".to_string()),
        }
    );
}

#[test]
fn closed_input_counts_as_reviewer_gone() {
    let (outcome, _output, decided) = review_with("");
    assert_eq!(decided, 0);
    assert_eq!(
        outcome,
        ReviewOutcome::Rejected {
            reason: RejectReason::ReviewerGone,
            note: None,
        }
    );
}

#[test]
fn mapping_table_lists_every_target() {
    let set = customer_set();
    let rendered = mapping_table(&set, &ConfidenceThresholds::default()).to_string();
    for column in ["customer_id", "customer_name", "customer_status", "(unmapped)"] {
        assert!(rendered.contains(column), "missing {column}:\n{rendered}");
    }
    assert_eq!(
        mapping_overview(&set),
        "cust_src -> customer: 2 of 3 columns mapped, average confidence 60%"
    );
}

#[test]
fn schema_table_names_each_table_once() {
    let snapshot = SchemaSnapshot::new(
        "proj",
        "lending_src",
        vec![
            TableSchema::from_pairs("cust_src", &[("cust_id", "INT64"), ("cust_name", "STRING")])
                .unwrap(),
        ],
    );
    let rendered = schema_table(&snapshot).to_string();
    assert_eq!(rendered.matches("cust_src").count(), 1);
    assert!(rendered.contains("cust_name"));
}
