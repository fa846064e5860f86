use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mapping::TablePair;
use crate::risk::RiskAssessment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlValidationStatus {
    Passed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlValidationSummary {
    pub status: SqlValidationStatus,
    pub warnings: Vec<String>,
}

/// SQL produced from an approved mapping set. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSql {
    pub source_table: String,
    pub target_table: String,
    pub insert_sql: String,
    pub merge_sql: String,
    /// Target column the MERGE matches on.
    pub merge_key: String,
    pub column_count: usize,
    pub mapped_count: usize,
    pub sql_validation: SqlValidationSummary,
    pub risk_assessment: RiskAssessment,
    pub generated_at: DateTime<Utc>,
}

impl GeneratedSql {
    pub fn key(&self) -> TablePair {
        TablePair::new(&self.source_table, &self.target_table)
    }
}
