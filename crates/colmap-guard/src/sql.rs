//! SQL safety policy.
//!
//! Statements are parsed with the BigQuery dialect and the syntax tree is
//! checked against a [`SqlPolicy`]: one statement of the expected kind,
//! writing to the expected table, reading only approved tables.

use std::fmt;
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use sqlparser::ast::{
    Expr, MergeAction, ObjectName, Query, SelectItem, SetExpr, Statement, TableFactor, Value,
    Visit, Visitor, visit_expressions,
};
use sqlparser::dialect::BigQueryDialect;
use sqlparser::parser::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    Insert,
    Merge,
}

impl StatementKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Merge => "MERGE",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// What a generated statement is allowed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlPolicy {
    pub expected: StatementKind,
    /// Fully qualified `project.dataset.table` the statement must write to.
    pub target_table: String,
    /// Fully qualified tables the statement may read from.
    pub allowed_sources: Vec<String>,
    /// Target key column a DELETE must be restricted on.
    pub key_column: Option<String>,
}

impl SqlPolicy {
    pub fn new(expected: StatementKind, target_table: impl Into<String>) -> Self {
        Self {
            expected,
            target_table: target_table.into(),
            allowed_sources: Vec::new(),
            key_column: None,
        }
    }

    #[must_use]
    pub fn allow_source(mut self, table: impl Into<String>) -> Self {
        self.allowed_sources.push(table.into());
        self
    }

    #[must_use]
    pub fn with_key_column(mut self, column: impl Into<String>) -> Self {
        self.key_column = Some(column.into());
        self
    }

    fn is_known_table(&self, name: &str) -> bool {
        name == self.target_table || self.allowed_sources.iter().any(|s| s == name)
    }

    fn is_keyed(&self, predicate: Option<&Expr>) -> bool {
        match (self.key_column.as_deref(), predicate) {
            (Some(key), Some(expr)) => references_column(expr, key),
            _ => false,
        }
    }
}

/// Result of a safety check. Errors are fatal; warnings are notices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlValidation {
    pub is_valid: bool,
    pub error_message: Option<String>,
    pub warnings: Vec<String>,
}

impl SqlValidation {
    fn passed(warnings: Vec<String>) -> Self {
        Self {
            is_valid: true,
            error_message: None,
            warnings,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error_message: Some(message.into()),
            warnings: Vec::new(),
        }
    }

    /// Warnings on success, the error message on failure.
    pub fn into_result(self) -> Result<Vec<String>, String> {
        match self.error_message {
            None => Ok(self.warnings),
            Some(message) => Err(message),
        }
    }
}

pub fn validate_sql(sql: &str, policy: &SqlPolicy) -> SqlValidation {
    match check_statement(sql, policy) {
        Ok(warnings) => SqlValidation::passed(warnings),
        Err(message) => SqlValidation::failed(message),
    }
}

fn check_statement(sql: &str, policy: &SqlPolicy) -> Result<Vec<String>, String> {
    let statements = Parser::parse_sql(&BigQueryDialect {}, sql)
        .map_err(|e| format!("could not parse SQL: {e}"))?;
    let statement = match statements.as_slice() {
        [] => return Err("empty SQL statement".to_string()),
        [single] => single,
        _ => {
            return Err(format!(
                "multiple statements detected ({}); stacked queries are not allowed",
                statements.len()
            ));
        }
    };

    if let Some(keyword) = forbidden_keyword(statement) {
        return Err(format!("forbidden statement {keyword}"));
    }
    check_deletes(statement, policy)?;
    check_target(statement, policy)?;

    let mut scan = Scan::default();
    let _ = statement.visit(&mut scan);
    if let Some(name) = scan.relations.iter().find(|n| !policy.is_known_table(n)) {
        return Err(format!("references table `{name}` outside the approved mapping"));
    }
    Ok(scan.into_warnings())
}

fn forbidden_keyword(statement: &Statement) -> Option<&'static str> {
    Some(match statement {
        Statement::Drop { .. } => "DROP",
        Statement::Truncate { .. } => "TRUNCATE",
        Statement::AlterTable { .. }
        | Statement::AlterView { .. }
        | Statement::AlterIndex { .. } => "ALTER",
        Statement::CreateTable { .. }
        | Statement::CreateView { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateSchema { .. } => "CREATE",
        Statement::Grant { .. } => "GRANT",
        Statement::Revoke { .. } => "REVOKE",
        _ => return None,
    })
}

fn check_deletes(statement: &Statement, policy: &SqlPolicy) -> Result<(), String> {
    let keyed = match statement {
        Statement::Delete(delete) => policy.is_keyed(delete.selection.as_ref()),
        Statement::Merge { clauses, .. } => clauses
            .iter()
            .filter(|clause| matches!(clause.action, MergeAction::Delete { .. }))
            .all(|clause| policy.is_keyed(clause.predicate.as_ref())),
        _ => true,
    };
    if keyed {
        Ok(())
    } else {
        Err("DELETE without a WHERE clause on the target key".to_string())
    }
}

fn check_target(statement: &Statement, policy: &SqlPolicy) -> Result<(), String> {
    let expected = policy.expected;
    let target = match (expected, statement) {
        (StatementKind::Insert, Statement::Insert(insert)) => table_name(&insert.table_name),
        (StatementKind::Merge, Statement::Merge { table, .. }) => match table {
            TableFactor::Table { name, .. } => table_name(name),
            other => return Err(format!("MERGE target `{other}` is not a table")),
        },
        (_, other) => {
            return Err(format!(
                "expected a single {expected} statement, found '{}'",
                statement_keyword(other)
            ));
        }
    };
    if target != policy.target_table {
        return Err(format!(
            "statement writes to `{target}` instead of `{}`",
            policy.target_table
        ));
    }
    Ok(())
}

/// Dotted name without quoting. A backticked `p.d.t` and `p`.`d`.`t` agree.
fn table_name(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

fn statement_keyword(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

fn references_column(expr: &Expr, column: &str) -> bool {
    visit_expressions(expr, |e| {
        let hit = match e {
            Expr::Identifier(ident) => ident.value.eq_ignore_ascii_case(column),
            Expr::CompoundIdentifier(parts) => parts
                .last()
                .is_some_and(|part| part.value.eq_ignore_ascii_case(column)),
            _ => false,
        };
        if hit {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })
    .is_break()
}

/// One pass over the tree: every table reference, including those in
/// subqueries and function arguments, plus what the warnings need.
#[derive(Debug, Default)]
struct Scan {
    relations: Vec<String>,
    null_columns: Vec<String>,
    casts: usize,
    wildcard: bool,
}

impl Visitor for Scan {
    type Break = ();

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<()> {
        self.relations.push(table_name(relation));
        ControlFlow::Continue(())
    }

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<()> {
        if let SetExpr::Select(select) = query.body.as_ref() {
            for item in &select.projection {
                match item {
                    SelectItem::ExprWithAlias {
                        expr: Expr::Value(Value::Null),
                        alias,
                    } => self.null_columns.push(alias.value.clone()),
                    SelectItem::Wildcard { .. } | SelectItem::QualifiedWildcard { .. } => {
                        self.wildcard = true;
                    }
                    _ => {}
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<()> {
        if matches!(expr, Expr::Cast { .. }) {
            self.casts += 1;
        }
        ControlFlow::Continue(())
    }
}

impl Scan {
    fn into_warnings(self) -> Vec<String> {
        let mut warnings: Vec<String> = self
            .null_columns
            .iter()
            .map(|column| {
                format!("column '{column}' has no source mapping and will be NULL-filled")
            })
            .collect();
        if self.casts > 0 {
            warnings.push(format!(
                "{} column(s) use CAST; verify source values convert cleanly",
                self.casts
            ));
        }
        if self.wildcard {
            warnings
                .push("SELECT * selects columns positionally; list columns explicitly".to_string());
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_policy() -> SqlPolicy {
        SqlPolicy::new(StatementKind::Insert, "p.tgt.customer").allow_source("p.src.cust_src")
    }

    fn merge_policy() -> SqlPolicy {
        SqlPolicy::new(StatementKind::Merge, "p.tgt.customer")
            .allow_source("p.src.cust_src")
            .with_key_column("customer_id")
    }

    #[test]
    fn comments_and_strings_are_not_keywords() {
        let sql = "-- DROP everything\nINSERT INTO `p.tgt.customer` (a)\nSELECT 'DROP; DELETE' AS a FROM `p.src.cust_src`; /* ; */";
        let result = validate_sql(sql, &insert_policy());
        assert!(result.is_valid, "{:?}", result.error_message);
    }

    #[test]
    fn unterminated_string_is_rejected() {
        let result = validate_sql("INSERT INTO `p.tgt.customer` SELECT 'oops", &insert_policy());
        assert!(
            result
                .error_message
                .as_deref()
                .is_some_and(|m| m.starts_with("could not parse SQL"))
        );
    }

    #[test]
    fn function_from_is_not_a_table() {
        let sql = "INSERT INTO `p.tgt.customer` (y)\nSELECT EXTRACT(YEAR FROM opened_date) AS y FROM `p.src.cust_src`";
        assert!(validate_sql(sql, &insert_policy()).is_valid);
    }

    #[test]
    fn merge_delete_requires_key_predicate() {
        let unkeyed = "MERGE `p.tgt.customer` AS target USING `p.src.cust_src` AS source ON TRUE WHEN MATCHED THEN DELETE";
        assert_eq!(
            validate_sql(unkeyed, &merge_policy()).error_message.as_deref(),
            Some("DELETE without a WHERE clause on the target key")
        );
        let keyed = "MERGE `p.tgt.customer` AS target USING `p.src.cust_src` AS source ON TRUE WHEN MATCHED AND target.customer_id = source.customer_id THEN DELETE";
        let result = validate_sql(keyed, &merge_policy());
        assert!(result.is_valid, "{:?}", result.error_message);
    }

    #[test]
    fn bare_delete_is_rejected() {
        let result = validate_sql("DELETE FROM `p.tgt.customer` WHERE TRUE", &merge_policy());
        assert_eq!(
            result.error_message.as_deref(),
            Some("DELETE without a WHERE clause on the target key")
        );
    }

    #[test]
    fn split_and_whole_quoted_names_agree() {
        let sql = "INSERT INTO `p`.`tgt`.`customer` (a) SELECT a FROM `p.src.cust_src`";
        let result = validate_sql(sql, &insert_policy());
        assert!(result.is_valid, "{:?}", result.error_message);
    }
}
