use colmap_guard::{IdentifierKind, validate_identifier};
use colmap_model::{IntegrationError, Result};
use colmap_warehouse::{SampleRows, Warehouse};
use tracing::debug;

pub const DEFAULT_SAMPLE_LIMIT: usize = 5;

/// Up to `limit` rows of `dataset_id.table` for data profiling.
pub fn sample(
    warehouse: &dyn Warehouse,
    dataset_id: &str,
    table: &str,
    limit: usize,
) -> Result<SampleRows> {
    validate_identifier(IdentifierKind::Dataset, dataset_id)?;
    validate_identifier(IdentifierKind::Table, table)?;
    let rows = warehouse
        .sample_rows(dataset_id, table, limit)
        .map_err(|e| IntegrationError::MetadataFetch {
            dataset_id: dataset_id.to_string(),
            message: e.to_string(),
        })?;
    debug!(dataset_id, table, rows = rows.rows.len(), "sample rows read");
    Ok(rows)
}
