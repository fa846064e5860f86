//! Tests for colmap-model types.

use colmap_model::{
    IntegrationError, MappingCandidate, MappingSet, MappingStatus, MatchRule, SchemaRole,
    SchemaSnapshot, TableSchema, Transform,
};

#[test]
fn mapping_set_serializes_original_field_names() {
    let set = MappingSet::new(
        "cust_src",
        "customer",
        vec![
            MappingCandidate {
                target_column: "amount".to_string(),
                target_type: "NUMERIC".to_string(),
                source_column: Some("amount".to_string()),
                source_type: Some("FLOAT64".to_string()),
                confidence: 0.85,
                transformation: Some(Transform::cast("NUMERIC")),
                status: MappingStatus::Suggested,
                rule: Some(MatchRule::ExactName),
            },
            MappingCandidate::unmapped("customer_status", "STRING"),
        ],
    );
    let json = serde_json::to_value(&set).expect("serialize mapping set");
    assert_eq!(json["mappings"][0]["status"], "suggested");
    assert_eq!(json["mappings"][0]["transformation"], "CAST({source} AS NUMERIC)");
    assert_eq!(json["mappings"][1]["status"], "unmapped");
    assert_eq!(json["stats"]["mapped_count"], 1);
    assert!(json.get("validation").is_none());

    let round: MappingSet = serde_json::from_value(json).expect("deserialize mapping set");
    assert_eq!(round, set);
}

#[test]
fn snapshot_serializes_column_wire_names() {
    let snapshot = SchemaSnapshot::new(
        "proj",
        "lending_src",
        vec![TableSchema::from_pairs("loans", &[("loan_id", "INT64")]).unwrap()],
    );
    let json = serde_json::to_value(&snapshot).expect("serialize snapshot");
    let column = &json["tables"][0]["columns"][0];
    assert_eq!(column["name"], "loan_id");
    assert_eq!(column["type"], "INT64");
    assert_eq!(column["position"], 1);
}

#[test]
fn schema_not_loaded_message_lists_roles() {
    let err = IntegrationError::SchemaNotLoaded {
        missing: vec![SchemaRole::Source, SchemaRole::Target],
    };
    assert!(err.to_string().contains("source and target"));
}

#[test]
fn table_not_found_names_role() {
    let err = IntegrationError::TableNotFound {
        role: SchemaRole::Target,
        table: "customer".to_string(),
    };
    assert_eq!(err.to_string(), "target table 'customer' not found in schema");
}
