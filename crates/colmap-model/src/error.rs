use thiserror::Error;

use crate::schema::SchemaRole;

/// Failures surfaced by pipeline stages.
///
/// Every stage returns these as values; none of them leave partial session
/// state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrationError {
    #[error("failed to fetch metadata for dataset '{dataset_id}': {message}")]
    MetadataFetch { dataset_id: String, message: String },

    #[error(
        "schema information not available for {}; load the source and target schemas first",
        missing_roles(.missing)
    )]
    SchemaNotLoaded { missing: Vec<SchemaRole> },

    #[error("{role} table '{table}' not found in schema")]
    TableNotFound { role: SchemaRole, table: String },

    #[error("invalid schema for table '{table}': {message}")]
    InvalidSchema { table: String, message: String },

    #[error("invalid {kind} identifier '{value}': {reason}")]
    InvalidIdentifier {
        kind: String,
        value: String,
        reason: String,
    },

    #[error(
        "no suggested mappings found for {source_table} -> {target_table}; run mapping suggestion first"
    )]
    NoSuggestion {
        source_table: String,
        target_table: String,
    },

    #[error("no approved mappings found for {source_table} -> {target_table}: {reason}")]
    NotApproved {
        source_table: String,
        target_table: String,
        reason: String,
    },

    #[error(
        "no generated SQL found for {source_table} -> {target_table}; generate transformation SQL first"
    )]
    NoSqlGenerated {
        source_table: String,
        target_table: String,
    },

    #[error("generated SQL for {source_table} -> {target_table} failed validation: {message}")]
    SqlValidation {
        source_table: String,
        target_table: String,
        message: String,
    },

    #[error("execution failed for {source_table} -> {target_table}: {message}")]
    Execution {
        source_table: String,
        target_table: String,
        message: String,
    },

    #[error("audit log unavailable: {0}")]
    Audit(String),
}

fn missing_roles(roles: &[SchemaRole]) -> String {
    roles
        .iter()
        .map(SchemaRole::as_str)
        .collect::<Vec<_>>()
        .join(" and ")
}

pub type Result<T> = std::result::Result<T, IntegrationError>;
