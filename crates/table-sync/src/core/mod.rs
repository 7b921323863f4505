//! Core abstractions shared by the engine and drivers.
//!
//! - [`value`]: scalar values and rows
//! - [`schema`]: column metadata and query results
//! - [`changeset`]: insert/update/delete partitions
//! - [`traits`]: the `Driver`, `Database` and `BatchApplier` capabilities
//! - [`catalog`]: driver registry for dependency injection
//! - [`identifier`]: identifier validation and quoting

pub mod catalog;
pub mod changeset;
pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use catalog::DriverCatalog;
pub use changeset::{ChangeSet, RowUpdate};
pub use schema::{single_primary_key, ColumnDefinition, QueryResult};
pub use traits::{BatchApplier, Database, Driver};
pub use value::{row, Row, SqlValue};
