use colmap_guard::{SqlPolicy, StatementKind, validate_sql};
use proptest::prelude::*;

const TARGET: &str = "proj.lending_tgt.customer";
const SOURCE: &str = "proj.lending_src.cust_src";

fn policy(kind: StatementKind) -> SqlPolicy {
    SqlPolicy::new(kind, TARGET)
        .allow_source(SOURCE)
        .with_key_column("customer_id")
}

fn insert_sql() -> String {
    format!(
        "INSERT INTO `{TARGET}` (customer_id, customer_name, customer_status)\n\
         SELECT\n    cust_id AS customer_id,\n    cust_name AS customer_name,\n    NULL AS customer_status\n\
         FROM `{SOURCE}`"
    )
}

#[test]
fn accepts_single_insert_select() {
    let result = validate_sql(&insert_sql(), &policy(StatementKind::Insert));
    assert!(result.is_valid, "{:?}", result.error_message);
    assert!(
        result
            .warnings
            .iter()
            .any(|w| w.contains("customer_status") && w.contains("NULL-filled"))
    );
}

#[test]
fn rejects_stacked_statements() {
    let sql = format!("{}; DELETE FROM `{TARGET}` WHERE TRUE", insert_sql());
    let result = validate_sql(&sql, &policy(StatementKind::Insert));
    assert!(!result.is_valid);
    assert!(
        result
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("multiple statements"))
    );
}

#[test]
fn trailing_semicolon_is_one_statement() {
    let sql = format!("{};  \n-- done\n", insert_sql());
    assert!(validate_sql(&sql, &policy(StatementKind::Insert)).is_valid);
}

#[test]
fn rejects_drop() {
    let sql = format!("DROP TABLE `{TARGET}`");
    let result = validate_sql(&sql, &policy(StatementKind::Insert));
    assert_eq!(result.error_message.as_deref(), Some("forbidden statement DROP"));
}

#[test]
fn rejects_wrong_statement_kind() {
    let result = validate_sql(&insert_sql(), &policy(StatementKind::Merge));
    assert!(
        result
            .error_message
            .as_deref()
            .is_some_and(|m| m.starts_with("expected a single MERGE statement"))
    );
}

#[test]
fn rejects_wrong_target() {
    let sql = insert_sql().replace(TARGET, "proj.lending_tgt.other");
    let result = validate_sql(&sql, &policy(StatementKind::Insert));
    assert!(
        result
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("instead of"))
    );
}

#[test]
fn rejects_unapproved_table_reference() {
    let sql = format!(
        "INSERT INTO `{TARGET}` (customer_id)\nSELECT id AS customer_id FROM `proj.hr.salaries`"
    );
    let result = validate_sql(&sql, &policy(StatementKind::Insert));
    assert!(
        result
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("proj.hr.salaries"))
    );
}

#[test]
fn rejects_unqualified_join() {
    let sql = format!(
        "INSERT INTO `{TARGET}` (customer_id)\nSELECT s.cust_id AS customer_id FROM `{SOURCE}` s JOIN salaries x ON TRUE"
    );
    assert!(!validate_sql(&sql, &policy(StatementKind::Insert)).is_valid);
}

#[test]
fn rejects_unapproved_table_inside_function_call() {
    let sql = format!(
        "INSERT INTO `{TARGET}` (a)\nSELECT ARRAY(SELECT ssn FROM secret_pii) AS a FROM `{SOURCE}`"
    );
    assert!(!validate_sql(&sql, &policy(StatementKind::Insert)).is_valid);
}

#[test]
fn rejects_unapproved_table_in_scalar_subquery() {
    let sql = format!(
        "INSERT INTO `{TARGET}` (a)\nSELECT (SELECT MAX(ssn) FROM `proj.hr.secret_pii`) AS a FROM `{SOURCE}`"
    );
    let result = validate_sql(&sql, &policy(StatementKind::Insert));
    assert_eq!(
        result.error_message.as_deref(),
        Some("references table `proj.hr.secret_pii` outside the approved mapping")
    );
}

#[test]
fn rejects_unapproved_table_inside_cast() {
    let sql = format!(
        "INSERT INTO `{TARGET}` (a)\nSELECT CAST((SELECT ssn FROM secret_pii LIMIT 1) AS STRING) AS a FROM `{SOURCE}`"
    );
    let result = validate_sql(&sql, &policy(StatementKind::Insert));
    assert!(
        result
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("secret_pii"))
    );
}

#[test]
fn rejects_truncate() {
    let sql = format!("TRUNCATE TABLE `{TARGET}`");
    let result = validate_sql(&sql, &policy(StatementKind::Insert));
    assert!(!result.is_valid);
}

#[test]
fn accepts_merge_and_warns_on_cast() {
    let sql = format!(
        "MERGE `{TARGET}` AS target\nUSING (\n  SELECT cust_id AS customer_id, CAST(amount AS NUMERIC) AS amount\n  FROM `{SOURCE}`\n) AS source\n\
         ON target.customer_id = source.customer_id\n\
         WHEN MATCHED THEN UPDATE SET amount = source.amount\n\
         WHEN NOT MATCHED THEN INSERT (customer_id, amount) VALUES (source.customer_id, source.amount)"
    );
    let result = validate_sql(&sql, &policy(StatementKind::Merge));
    assert!(result.is_valid, "{:?}", result.error_message);
    assert!(result.warnings.iter().any(|w| w.contains("CAST")));
}

#[test]
fn keywords_inside_comments_are_ignored() {
    let sql = format!("/* DROP TABLE x; */ {}", insert_sql());
    assert!(validate_sql(&sql, &policy(StatementKind::Insert)).is_valid);
}

proptest! {
    #[test]
    fn appended_statement_is_always_rejected(tail in "[A-Za-z ]{1,40}") {
        prop_assume!(!tail.trim().is_empty());
        let sql = format!("{}; {tail}", insert_sql());
        prop_assert!(!validate_sql(&sql, &policy(StatementKind::Insert)).is_valid);
    }

    #[test]
    fn validation_never_panics(sql in ".{0,200}") {
        let _ = validate_sql(&sql, &policy(StatementKind::Insert));
    }
}
