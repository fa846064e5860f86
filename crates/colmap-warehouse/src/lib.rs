//! Warehouse client abstraction.
//!
//! The pipeline talks to the warehouse only through [`Warehouse`]. The
//! [`MemoryWarehouse`] serves a JSON catalog and is used by the CLI and tests.

#![deny(unsafe_code)]

mod error;
mod memory;
mod types;

pub use error::WarehouseError;
pub use memory::{Catalog, CatalogColumn, CatalogDataset, CatalogTable, MemoryWarehouse};
pub use types::{MetadataRow, QueryMode, QueryOutcome, SampleRows};

/// Client operations the pipeline needs from a columnar warehouse.
pub trait Warehouse {
    /// Project the client is bound to.
    fn project_id(&self) -> &str;

    /// Catalog rows for every column of every table in `dataset_id`, ordered
    /// by table name then ordinal position. An empty dataset is `Ok(vec![])`.
    fn fetch_columns(&self, dataset_id: &str) -> Result<Vec<MetadataRow>, WarehouseError>;

    /// Runs a statement. Dry runs estimate cost without touching data; live
    /// runs block until the job completes.
    fn run_query(&self, sql: &str, mode: QueryMode) -> Result<QueryOutcome, WarehouseError>;

    /// Up to `limit` rows from a table.
    fn sample_rows(
        &self,
        dataset_id: &str,
        table: &str,
        limit: usize,
    ) -> Result<SampleRows, WarehouseError>;
}
