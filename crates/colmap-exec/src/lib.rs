//! Execution gateway.
//!
//! Sends one generated statement to the warehouse, either as a dry run that
//! only estimates bytes processed or as a live job that blocks until it
//! completes.

#![deny(unsafe_code)]

use std::fmt;

use chrono::{DateTime, Utc};
use colmap_guard::{RiskContext, assess_risk};
use colmap_model::{GeneratedSql, IntegrationError, Result, RiskAssessment, RiskOperation};
use colmap_warehouse::{QueryMode, QueryOutcome, Warehouse};
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span};

/// Which generated statement to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlVariant {
    #[default]
    Insert,
    Merge,
}

impl SqlVariant {
    pub fn statement<'a>(&self, sql: &'a GeneratedSql) -> &'a str {
        match self {
            Self::Insert => &sql.insert_sql,
            Self::Merge => &sql.merge_sql,
        }
    }
}

impl fmt::Display for SqlVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insert => "insert",
            Self::Merge => "merge",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Validated {
        bytes_processed: u64,
    },
    Executed {
        job_id: String,
        rows_affected: u64,
        bytes_processed: u64,
    },
}

impl ExecutionOutcome {
    pub fn bytes_processed(&self) -> u64 {
        match self {
            Self::Validated { bytes_processed } | Self::Executed { bytes_processed, .. } => {
                *bytes_processed
            }
        }
    }
}

impl From<QueryOutcome> for ExecutionOutcome {
    fn from(outcome: QueryOutcome) -> Self {
        match outcome {
            QueryOutcome::DryRun {
                total_bytes_processed,
            } => Self::Validated {
                bytes_processed: total_bytes_processed,
            },
            QueryOutcome::Live {
                job_id,
                rows_affected,
                total_bytes_processed,
            } => Self::Executed {
                job_id,
                rows_affected,
                bytes_processed: total_bytes_processed,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub source_table: String,
    pub target_table: String,
    pub variant: SqlVariant,
    pub dry_run: bool,
    pub outcome: ExecutionOutcome,
    pub risk_assessment: RiskAssessment,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionReport {
    pub fn message(&self) -> String {
        match &self.outcome {
            ExecutionOutcome::Validated { bytes_processed } => format!(
                "Dry run passed; the {} statement would process {} bytes.",
                self.variant, bytes_processed
            ),
            ExecutionOutcome::Executed {
                job_id,
                rows_affected,
                ..
            } => format!(
                "Job {job_id} completed; {rows_affected} row(s) written to {}.",
                self.target_table
            ),
        }
    }
}

/// Runs generated statements against a [`Warehouse`].
pub struct ExecutionGateway<'w> {
    warehouse: &'w dyn Warehouse,
}

impl fmt::Debug for ExecutionGateway<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionGateway")
            .field("project_id", &self.warehouse.project_id())
            .finish()
    }
}

impl<'w> ExecutionGateway<'w> {
    pub fn new(warehouse: &'w dyn Warehouse) -> Self {
        Self { warehouse }
    }

    /// Any warehouse failure is returned as [`IntegrationError::Execution`].
    pub fn execute(
        &self,
        sql: &GeneratedSql,
        variant: SqlVariant,
        dry_run: bool,
    ) -> Result<ExecutionReport> {
        let span = info_span!(
            "execute",
            source = %sql.source_table,
            target = %sql.target_table,
            %variant,
            dry_run
        );
        let _guard = span.enter();

        let outcome = self
            .warehouse
            .run_query(variant.statement(sql), QueryMode::from_dry_run(dry_run))
            .map_err(|e| {
                error!(error = %e, "execution failed");
                IntegrationError::Execution {
                    source_table: sql.source_table.clone(),
                    target_table: sql.target_table.clone(),
                    message: e.to_string(),
                }
            })?;
        let outcome = ExecutionOutcome::from(outcome);
        info!(bytes = outcome.bytes_processed(), "statement finished");

        Ok(ExecutionReport {
            source_table: sql.source_table.clone(),
            target_table: sql.target_table.clone(),
            variant,
            dry_run,
            outcome,
            risk_assessment: assess_risk(
                RiskOperation::SqlExecute,
                &RiskContext::execution(dry_run),
            ),
            finished_at: Utc::now(),
        })
    }
}
