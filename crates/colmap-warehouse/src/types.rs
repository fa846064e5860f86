use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of the warehouse's `INFORMATION_SCHEMA.COLUMNS` view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRow {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    /// The catalog reports `"YES"` / `"NO"`.
    pub is_nullable: String,
    pub ordinal_position: u32,
}

impl MetadataRow {
    pub fn nullable(&self) -> bool {
        self.is_nullable.eq_ignore_ascii_case("YES")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    DryRun,
    Live,
}

impl QueryMode {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run { Self::DryRun } else { Self::Live }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum QueryOutcome {
    DryRun {
        total_bytes_processed: u64,
    },
    Live {
        job_id: String,
        rows_affected: u64,
        total_bytes_processed: u64,
    },
}

impl QueryOutcome {
    pub fn bytes_processed(&self) -> u64 {
        match self {
            Self::DryRun {
                total_bytes_processed,
            }
            | Self::Live {
                total_bytes_processed,
                ..
            } => *total_bytes_processed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRows {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}
