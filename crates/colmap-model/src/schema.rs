//! Canonical schema representation built from warehouse metadata.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IntegrationError;

/// Which side of a mapping a schema snapshot describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaRole {
    Source,
    Target,
}

impl SchemaRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaRole::Source => "source",
            SchemaRole::Target => "target",
        }
    }
}

impl fmt::Display for SchemaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single column as reported by the warehouse catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name, case preserved.
    pub name: String,
    /// Declared warehouse type (e.g., "INT64", "STRING", "NUMERIC").
    #[serde(rename = "type")]
    pub declared_type: String,
    pub nullable: bool,
    /// Ordinal position within the table.
    #[serde(rename = "position")]
    pub ordinal: u32,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, ordinal: u32) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            nullable: true,
            ordinal,
        }
    }

    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// Columns of one table in ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Builds a table schema, rejecting duplicate column names and
    /// non-increasing ordinal positions.
    pub fn new(
        table_name: impl Into<String>,
        columns: Vec<ColumnSchema>,
    ) -> Result<Self, IntegrationError> {
        let table = Self {
            table_name: table_name.into(),
            columns,
        };
        table.check_invariants()?;
        Ok(table)
    }

    /// Convenience constructor for `(name, type)` pairs with ordinals assigned
    /// from 1.
    pub fn from_pairs(
        table_name: impl Into<String>,
        columns: &[(&str, &str)],
    ) -> Result<Self, IntegrationError> {
        let columns = columns
            .iter()
            .enumerate()
            .map(|(idx, (name, ty))| ColumnSchema::new(*name, *ty, idx as u32 + 1))
            .collect();
        Self::new(table_name, columns)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> BTreeSet<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn check_invariants(&self) -> Result<(), IntegrationError> {
        let mut seen = BTreeSet::new();
        let mut last_ordinal: Option<u32> = None;
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(IntegrationError::InvalidSchema {
                    table: self.table_name.clone(),
                    message: format!("duplicate column '{}'", column.name),
                });
            }
            if let Some(last) = last_ordinal
                && column.ordinal <= last
            {
                return Err(IntegrationError::InvalidSchema {
                    table: self.table_name.clone(),
                    message: format!(
                        "ordinal position {} of '{}' does not follow {}",
                        column.ordinal, column.name, last
                    ),
                });
            }
            last_ordinal = Some(column.ordinal);
        }
        Ok(())
    }
}

/// All tables of a dataset at the time the catalog was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub dataset_id: String,
    pub project_id: String,
    pub tables: Vec<TableSchema>,
}

impl SchemaSnapshot {
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        tables: Vec<TableSchema>,
    ) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            project_id: project_id.into(),
            tables,
        }
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Looks up a table by exact name.
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.table_name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.table_name.as_str()).collect()
    }

    /// Fully qualified `project.dataset.table` reference.
    pub fn qualified(&self, table: &str) -> String {
        format!("{}.{}.{}", self.project_id, self.dataset_id, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_columns() {
        let err = TableSchema::from_pairs("t", &[("a", "INT64"), ("a", "STRING")]).unwrap_err();
        assert!(err.to_string().contains("duplicate column 'a'"));
    }

    #[test]
    fn rejects_non_increasing_ordinals() {
        let columns = vec![
            ColumnSchema::new("a", "INT64", 2),
            ColumnSchema::new("b", "INT64", 2),
        ];
        assert!(TableSchema::new("t", columns).is_err());
    }

    #[test]
    fn column_names_are_case_sensitive() {
        let table = TableSchema::from_pairs("t", &[("Id", "INT64"), ("id", "INT64")]).unwrap();
        assert_eq!(table.column_names().len(), 2);
    }

    #[test]
    fn qualified_reference() {
        let snapshot = SchemaSnapshot::new("proj", "ds", vec![]);
        assert_eq!(snapshot.qualified("orders"), "proj.ds.orders");
        assert_eq!(snapshot.table_count(), 0);
    }
}
