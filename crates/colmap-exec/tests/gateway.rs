use chrono::Utc;
use colmap_exec::{ExecutionGateway, ExecutionOutcome, SqlVariant};
use colmap_model::{
    GeneratedSql, IntegrationError, MappingCandidate, MappingSet, MappingStatus, RiskLevel,
};
use colmap_sql::SqlSynthesizer;
use colmap_warehouse::{Catalog, MemoryWarehouse};

const TARGET: &str = "proj.tgt.customer";

fn warehouse() -> MemoryWarehouse {
    MemoryWarehouse::new(
        Catalog::new("proj")
            .with_table("src", "cust_src", &[("cust_id", "INT64")], 4)
            .with_table("tgt", "customer", &[("customer_id", "INT64")], 0),
    )
}

fn generated() -> GeneratedSql {
    let set = MappingSet::new(
        "cust_src",
        "customer",
        vec![MappingCandidate {
            target_column: "customer_id".to_string(),
            target_type: "INT64".to_string(),
            source_column: Some("cust_id".to_string()),
            source_type: Some("INT64".to_string()),
            confidence: 0.6,
            transformation: None,
            status: MappingStatus::Suggested,
            rule: None,
        }],
    );
    SqlSynthesizer::new("proj", "src", "tgt")
        .synthesize(&set, Utc::now())
        .expect("synthesize")
}

#[test]
fn dry_run_reports_bytes_without_writing() {
    let wh = warehouse();
    let report = ExecutionGateway::new(&wh)
        .execute(&generated(), SqlVariant::Insert, true)
        .expect("dry run");
    assert_eq!(
        report.outcome,
        ExecutionOutcome::Validated {
            bytes_processed: 32
        }
    );
    assert_eq!(report.risk_assessment.risk_level, RiskLevel::Low);
    assert!(report.message().starts_with("Dry run passed"));
    assert_eq!(wh.row_count(TARGET), Some(0));
}

#[test]
fn live_run_returns_job_and_rows() {
    let wh = warehouse();
    let report = ExecutionGateway::new(&wh)
        .execute(&generated(), SqlVariant::Insert, false)
        .expect("live run");
    let ExecutionOutcome::Executed {
        job_id,
        rows_affected,
        ..
    } = &report.outcome
    else {
        panic!("expected live outcome, got {:?}", report.outcome);
    };
    assert!(job_id.starts_with("job_"));
    assert_eq!(*rows_affected, 4);
    assert_eq!(report.risk_assessment.risk_level, RiskLevel::Medium);
    assert_eq!(wh.row_count(TARGET), Some(4));
}

#[test]
fn merge_variant_is_repeatable() {
    let wh = warehouse();
    let gateway = ExecutionGateway::new(&wh);
    let sql = generated();
    gateway.execute(&sql, SqlVariant::Merge, false).expect("first merge");
    gateway.execute(&sql, SqlVariant::Merge, false).expect("second merge");
    assert_eq!(wh.row_count(TARGET), Some(4));
    let queries = wh.executed_queries();
    assert!(queries.iter().all(|(_, q)| q.contains("MERGE")));
}

#[test]
fn warehouse_failure_is_execution_error() {
    let wh = warehouse().with_query_failure("quota exceeded");
    let err = ExecutionGateway::new(&wh)
        .execute(&generated(), SqlVariant::Insert, true)
        .unwrap_err();
    assert_eq!(
        err,
        IntegrationError::Execution {
            source_table: "cust_src".to_string(),
            target_table: "customer".to_string(),
            message: "query rejected: quota exceeded".to_string(),
        }
    );
}

#[test]
fn report_serializes_status_tag() {
    let wh = warehouse();
    let report = ExecutionGateway::new(&wh)
        .execute(&generated(), SqlVariant::Insert, true)
        .expect("dry run");
    let json = serde_json::to_value(&report).expect("json");
    assert_eq!(json["outcome"]["status"], "validated");
    assert_eq!(json["variant"], "insert");
}
