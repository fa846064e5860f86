//! Metadata catalog rows to [`SchemaSnapshot`].

use colmap_guard::{IdentifierKind, validate_identifier};
use colmap_model::{ColumnSchema, IntegrationError, Result, SchemaSnapshot, TableSchema};
use colmap_warehouse::{MetadataRow, Warehouse};
use tracing::{debug, info};

/// Reads every table of `dataset_id` from the warehouse catalog.
///
/// Tables keep the order in which they first appear in the catalog rows and
/// columns keep their ordinal order. An empty dataset produces an empty
/// snapshot.
///
/// # Errors
///
/// Returns [`IntegrationError::InvalidIdentifier`] for an unsafe dataset id
/// and [`IntegrationError::MetadataFetch`] when the catalog read fails or the
/// rows violate the schema invariants.
pub fn build_snapshot(warehouse: &dyn Warehouse, dataset_id: &str) -> Result<SchemaSnapshot> {
    validate_identifier(IdentifierKind::Dataset, dataset_id)?;

    let rows = warehouse
        .fetch_columns(dataset_id)
        .map_err(|e| IntegrationError::MetadataFetch {
            dataset_id: dataset_id.to_string(),
            message: e.to_string(),
        })?;
    debug!(dataset_id, rows = rows.len(), "metadata rows received");

    let tables = group_rows(rows)
        .into_iter()
        .map(|(name, columns)| TableSchema::new(name, columns))
        .collect::<Result<Vec<_>>>()
        .map_err(|e| IntegrationError::MetadataFetch {
            dataset_id: dataset_id.to_string(),
            message: e.to_string(),
        })?;

    let snapshot = SchemaSnapshot::new(warehouse.project_id(), dataset_id, tables);
    info!(
        dataset_id,
        tables = snapshot.table_count(),
        "schema snapshot built"
    );
    Ok(snapshot)
}

fn group_rows(rows: Vec<MetadataRow>) -> Vec<(String, Vec<ColumnSchema>)> {
    let mut grouped: Vec<(String, Vec<ColumnSchema>)> = Vec::new();
    for row in rows {
        let column = ColumnSchema::new(&row.column_name, &row.data_type, row.ordinal_position)
            .with_nullable(row.nullable());
        match grouped.iter_mut().find(|(name, _)| *name == row.table_name) {
            Some((_, columns)) => columns.push(column),
            None => grouped.push((row.table_name, vec![column])),
        }
    }
    for (_, columns) in &mut grouped {
        columns.sort_by_key(|c| c.ordinal);
    }
    grouped
}
