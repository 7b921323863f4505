//! Capability traits implemented by database drivers.
//!
//! The engine never talks to a client library directly. It sees:
//!
//! - [`Driver`]: opens a connection from a [`ConnectionConfig`]
//! - [`Database`]: an open connection (introspection, queries, statements)
//! - [`BatchApplier`]: optional transactional writer for a [`ChangeSet`]
//!
//! One driver exists per engine; hosts register them in a
//! [`DriverCatalog`](super::DriverCatalog).

use async_trait::async_trait;

use crate::config::ConnectionConfig;
use crate::error::Result;

use super::changeset::ChangeSet;
use super::schema::{ColumnDefinition, QueryResult};

/// Factory for connections to one database engine.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Database type this driver serves (e.g. "mysql").
    fn name(&self) -> &str;

    /// Open a connection.
    ///
    /// The returned handle is owned by the caller, who must [`Database::close`] it.
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Database>>;
}

/// An open connection to one database.
#[async_trait]
pub trait Database: Send + Sync {
    /// Database type identifier (e.g. "mysql", "postgres").
    fn db_type(&self) -> &str;

    /// Release the connection.
    async fn close(&mut self) -> Result<()>;

    /// Columns of a table. An empty list means the table does not exist.
    async fn get_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnDefinition>>;

    /// The engine's native `CREATE TABLE` statement for a table.
    async fn get_create_statement(&self, schema: &str, table: &str) -> Result<String>;

    /// Run a query and return every row.
    async fn query(&self, sql: &str) -> Result<QueryResult>;

    /// Run a statement and return the affected row count.
    async fn exec(&self, sql: &str) -> Result<u64>;

    /// The batch writer of this connection, if the driver has one.
    fn batch_applier(&self) -> Option<&dyn BatchApplier> {
        None
    }
}

/// Applies a [`ChangeSet`] to one table in a single transaction.
#[async_trait]
pub trait BatchApplier: Send + Sync {
    /// Apply inserts, updates, and deletes to `table`.
    ///
    /// `table` is already quoted and schema-qualified for this engine and can
    /// be spliced into statements as is. Either every change is committed or
    /// none is.
    async fn apply_changes(&self, table: &str, changes: &ChangeSet) -> Result<()>;
}
