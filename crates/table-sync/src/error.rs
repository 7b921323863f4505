//! Error types for the synchronization engine.

use thiserror::Error;

/// Which end of a sync job a connection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Target => write!(f, "target"),
        }
    }
}

/// Main error type for sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// No driver registered for the requested database type
    #[error("No driver registered for database type '{0}'")]
    UnknownDriver(String),

    /// Opening a connection failed
    #[error("Failed to connect to {side} database: {message}")]
    Connection { side: Side, message: String },

    /// A query returned an error
    #[error("Query failed: {0}")]
    Query(String),

    /// A statement returned an error
    #[error("Statement failed: {0}")]
    Exec(String),

    /// Table has no primary key column
    #[error("Table {0} has no primary key - sync requires a single-column primary key")]
    NoPrimaryKey(String),

    /// Table has more than one primary key column
    #[error("Table {table} has a composite primary key ({}) - only single-column keys are supported", .columns.join(", "))]
    CompositePrimaryKey { table: String, columns: Vec<String> },

    /// Creating or altering the target table failed
    #[error("Schema alignment failed for table {table}: {message}")]
    Schema { table: String, message: String },

    /// Source DDL cannot be replayed on the target engine
    #[error("Cannot create table from {source_type} DDL on a {target_type} target - create the table manually")]
    UnsupportedDdl {
        source_type: String,
        target_type: String,
    },

    /// Applying a change set to the target failed
    #[error("Apply failed for table {table}: {message}")]
    Apply { table: String, message: String },

    /// Identifier rejected by validation
    #[error("Invalid identifier: {0}")]
    Identifier(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Create a Connection error.
    pub fn connection(side: Side, message: impl Into<String>) -> Self {
        SyncError::Connection {
            side,
            message: message.into(),
        }
    }

    /// Create a Schema error.
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Schema {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an Apply error.
    pub fn apply(table: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Apply {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Whether this error stops the whole job rather than a single table.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::UnknownDriver(_) | SyncError::Connection { .. }
        )
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
