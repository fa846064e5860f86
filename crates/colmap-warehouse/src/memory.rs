//! In-memory warehouse backed by a JSON catalog.
//!
//! # Catalog Format
//!
//! ```json
//! {
//!   "project_id": "demo",
//!   "datasets": [
//!     {
//!       "dataset_id": "lending_src",
//!       "tables": [
//!         {
//!           "name": "cust_src",
//!           "row_count": 120,
//!           "columns": [{ "name": "cust_id", "type": "INT64", "nullable": false }],
//!           "sample_rows": [{ "cust_id": 1 }]
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::WarehouseError;
use crate::types::{MetadataRow, QueryMode, QueryOutcome, SampleRows};
use crate::Warehouse;

/// Estimated bytes per cell used for dry-run cost estimates.
const BYTES_PER_CELL: u64 = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub project_id: String,
    #[serde(default)]
    pub datasets: Vec<CatalogDataset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDataset {
    pub dataset_id: String,
    #[serde(default)]
    pub tables: Vec<CatalogTable>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogTable {
    pub name: String,
    #[serde(default)]
    pub row_count: u64,
    pub columns: Vec<CatalogColumn>,
    #[serde(default)]
    pub sample_rows: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl Catalog {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            datasets: Vec::new(),
        }
    }

    /// Adds a table with `(name, type)` columns, creating the dataset if
    /// needed.
    #[must_use]
    pub fn with_table(
        mut self,
        dataset_id: &str,
        table: &str,
        columns: &[(&str, &str)],
        row_count: u64,
    ) -> Self {
        let table = CatalogTable {
            name: table.to_string(),
            row_count,
            columns: columns
                .iter()
                .map(|(name, ty)| CatalogColumn {
                    name: (*name).to_string(),
                    data_type: (*ty).to_string(),
                    nullable: true,
                })
                .collect(),
            sample_rows: Vec::new(),
        };
        match self
            .datasets
            .iter_mut()
            .find(|d| d.dataset_id == dataset_id)
        {
            Some(dataset) => dataset.tables.push(table),
            None => self.datasets.push(CatalogDataset {
                dataset_id: dataset_id.to_string(),
                tables: vec![table],
            }),
        }
        self
    }

    pub fn from_json(json: &str) -> Result<Self, WarehouseError> {
        serde_json::from_str(json).map_err(|e| WarehouseError::Catalog(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, WarehouseError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| WarehouseError::Catalog(format!("{}: {e}", path.display())))?;
        Self::from_json(&contents)
    }

    fn dataset(&self, dataset_id: &str) -> Option<&CatalogDataset> {
        self.datasets.iter().find(|d| d.dataset_id == dataset_id)
    }
}

/// Warehouse that answers from a [`Catalog`] and tracks row counts for live
/// runs.
#[derive(Debug)]
pub struct MemoryWarehouse {
    catalog: Catalog,
    row_counts: Mutex<BTreeMap<String, u64>>,
    unreadable: BTreeSet<String>,
    query_failure: Option<String>,
    queries: Mutex<Vec<(QueryMode, String)>>,
}

impl MemoryWarehouse {
    pub fn new(catalog: Catalog) -> Self {
        let mut row_counts = BTreeMap::new();
        for dataset in &catalog.datasets {
            for table in &dataset.tables {
                row_counts.insert(
                    qualified(&catalog.project_id, &dataset.dataset_id, &table.name),
                    table.row_count,
                );
            }
        }
        Self {
            catalog,
            row_counts: Mutex::new(row_counts),
            unreadable: BTreeSet::new(),
            query_failure: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Makes metadata reads for `dataset_id` fail.
    #[must_use]
    pub fn with_unreadable_dataset(mut self, dataset_id: &str) -> Self {
        self.unreadable.insert(dataset_id.to_string());
        self
    }

    /// Makes every query fail with `message`.
    #[must_use]
    pub fn with_query_failure(mut self, message: &str) -> Self {
        self.query_failure = Some(message.to_string());
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Current row count of a fully qualified table.
    pub fn row_count(&self, qualified_table: &str) -> Option<u64> {
        self.row_counts
            .lock()
            .ok()
            .and_then(|counts| counts.get(qualified_table).copied())
    }

    /// Statements received so far, in order.
    pub fn executed_queries(&self) -> Vec<(QueryMode, String)> {
        self.queries
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }

    fn column_count(&self, qualified_table: &str) -> u64 {
        self.catalog
            .datasets
            .iter()
            .flat_map(|d| {
                d.tables
                    .iter()
                    .map(move |t| (qualified(&self.catalog.project_id, &d.dataset_id, &t.name), t))
            })
            .find(|(name, _)| name == qualified_table)
            .map_or(0, |(_, t)| t.columns.len() as u64)
    }

    /// Tables referenced by backtick-quoted name, in order of first
    /// appearance.
    fn referenced_tables(&self, sql: &str, counts: &BTreeMap<String, u64>) -> Vec<String> {
        let mut found: Vec<(usize, String)> = counts
            .keys()
            .filter_map(|name| sql.find(&format!("`{name}`")).map(|pos| (pos, name.clone())))
            .collect();
        found.sort();
        found.into_iter().map(|(_, name)| name).collect()
    }
}

impl Warehouse for MemoryWarehouse {
    fn project_id(&self) -> &str {
        &self.catalog.project_id
    }

    fn fetch_columns(&self, dataset_id: &str) -> Result<Vec<MetadataRow>, WarehouseError> {
        if self.unreadable.contains(dataset_id) {
            return Err(WarehouseError::DatasetNotFound(dataset_id.to_string()));
        }
        let dataset = self
            .catalog
            .dataset(dataset_id)
            .ok_or_else(|| WarehouseError::DatasetNotFound(dataset_id.to_string()))?;
        let mut rows: Vec<MetadataRow> = dataset
            .tables
            .iter()
            .flat_map(|table| {
                table
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(idx, column)| MetadataRow {
                        table_name: table.name.clone(),
                        column_name: column.name.clone(),
                        data_type: column.data_type.clone(),
                        is_nullable: if column.nullable { "YES" } else { "NO" }.to_string(),
                        ordinal_position: idx as u32 + 1,
                    })
            })
            .collect();
        rows.sort_by(|a, b| {
            a.table_name
                .cmp(&b.table_name)
                .then(a.ordinal_position.cmp(&b.ordinal_position))
        });
        debug!(dataset_id, row_count = rows.len(), "catalog rows fetched");
        Ok(rows)
    }

    fn run_query(&self, sql: &str, mode: QueryMode) -> Result<QueryOutcome, WarehouseError> {
        if let Some(message) = &self.query_failure {
            return Err(WarehouseError::QueryRejected(message.clone()));
        }
        let mut counts = self
            .row_counts
            .lock()
            .map_err(|_| WarehouseError::Catalog("row count lock poisoned".to_string()))?;
        let referenced = self.referenced_tables(sql, &counts);
        let Some((target, sources)) = referenced.split_first() else {
            return Err(WarehouseError::QueryRejected(
                "statement does not reference a known table".to_string(),
            ));
        };
        if sources.is_empty() {
            return Err(WarehouseError::QueryRejected(format!(
                "statement reads no source table besides {target}"
            )));
        }

        let source_rows: u64 = sources.iter().filter_map(|s| counts.get(s)).sum();
        let bytes: u64 = sources
            .iter()
            .map(|s| counts.get(s).copied().unwrap_or(0) * self.column_count(s) * BYTES_PER_CELL)
            .sum();

        if let Ok(mut queries) = self.queries.lock() {
            queries.push((mode, sql.to_string()));
        }

        if mode.is_dry_run() {
            return Ok(QueryOutcome::DryRun {
                total_bytes_processed: bytes,
            });
        }

        let is_merge = first_keyword(sql).is_some_and(|k| k.eq_ignore_ascii_case("MERGE"));
        let target_rows = counts.entry(target.clone()).or_insert(0);
        if is_merge {
            *target_rows = (*target_rows).max(source_rows);
        } else {
            *target_rows += source_rows;
        }
        let job_id = format!("job_{}", Uuid::new_v4().simple());
        debug!(%job_id, rows_affected = source_rows, target = %target, "live query completed");
        Ok(QueryOutcome::Live {
            job_id,
            rows_affected: source_rows,
            total_bytes_processed: bytes,
        })
    }

    fn sample_rows(
        &self,
        dataset_id: &str,
        table: &str,
        limit: usize,
    ) -> Result<SampleRows, WarehouseError> {
        let dataset = self
            .catalog
            .dataset(dataset_id)
            .ok_or_else(|| WarehouseError::DatasetNotFound(dataset_id.to_string()))?;
        let table_def = dataset
            .tables
            .iter()
            .find(|t| t.name == table)
            .ok_or_else(|| WarehouseError::TableNotFound {
                dataset: dataset_id.to_string(),
                table: table.to_string(),
            })?;
        Ok(SampleRows {
            columns: table_def.columns.iter().map(|c| c.name.clone()).collect(),
            rows: table_def.sample_rows.iter().take(limit).cloned().collect(),
        })
    }
}

fn qualified(project: &str, dataset: &str, table: &str) -> String {
    format!("{project}.{dataset}.{table}")
}

/// First keyword after leading `--` comment lines.
fn first_keyword(sql: &str) -> Option<&str> {
    sql.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("--"))
        .and_then(|line| line.split_whitespace().next())
}
