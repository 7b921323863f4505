//! Column metadata and query results returned by drivers.

use serde::{Deserialize, Serialize};

use super::value::Row;
use crate::error::{Result, SyncError};

/// One column as reported by a driver's introspection query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,

    /// Native type string (e.g. "varchar(255)", "bigint unsigned").
    pub data_type: String,

    /// Whether NULL is allowed.
    pub nullable: bool,

    /// Whether the column is part of the primary key.
    pub primary_key: bool,

    /// Default expression, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Column comment, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ColumnDefinition {
    /// Create a nullable, non-key column.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
            default: None,
            comment: None,
        }
    }

    /// Mark this column as the primary key (implies NOT NULL).
    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

/// Resolve the single primary-key column of a table.
///
/// Zero or several key columns is an error: rows are matched on one key.
pub fn single_primary_key(table: &str, columns: &[ColumnDefinition]) -> Result<String> {
    let keys: Vec<&ColumnDefinition> = columns.iter().filter(|c| c.primary_key).collect();
    match keys.as_slice() {
        [] => Err(SyncError::NoPrimaryKey(table.to_string())),
        [pk] => Ok(pk.name.clone()),
        many => Err(SyncError::CompositePrimaryKey {
            table: table.to_string(),
            columns: many.iter().map(|c| c.name.clone()).collect(),
        }),
    }
}

/// Rows and column names returned by a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Column names in select order.
    pub columns: Vec<String>,

    /// Rows in the order the database returned them.
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
