//! # table-sync
//!
//! Diff-and-apply synchronization of SQL tables between two databases.
//!
//! For each requested table the engine reads both sides in full, matches rows
//! on the single-column primary key, and turns the difference into inserts,
//! updates and deletes. Jobs can:
//!
//! - **Analyze**: count what a sync would change
//! - **Preview**: sample the differing rows of one table
//! - **Sync**: apply the changes, optionally creating missing target tables
//!   and columns first
//!
//! Database access goes through the [`Driver`], [`Database`] and
//! [`BatchApplier`] traits; the host registers one driver per engine in a
//! [`DriverCatalog`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use table_sync::{DriverCatalog, SyncConfig, SyncEngine};
//!
//! # async fn run(mysql: Arc<dyn table_sync::Driver>) -> anyhow::Result<()> {
//! let config = SyncConfig::load("sync.yaml")?;
//! let engine = SyncEngine::new(DriverCatalog::new().with_driver(mysql));
//! let result = engine.run_sync(&config).await;
//! println!("{}", result.message);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod orchestrator;
pub mod reporter;
pub(crate) mod schema_align;

// Re-exports for convenient access
pub use config::{ConnectionConfig, ContentMode, SyncConfig, SyncMode, TableOptions};
pub use crate::core::{
    BatchApplier, ChangeSet, ColumnDefinition, Database, Driver, DriverCatalog, QueryResult, Row,
    RowUpdate, SqlValue,
};
pub use diff::{AnalyzeResult, TableDiffPreview, TableDiffSummary, UpdatePreview};
pub use error::{Result, Side, SyncError};
pub use orchestrator::{HealthCheckResult, SyncEngine, SyncResult, TableStatus, TableSyncReport};
pub use reporter::{
    CallbackReporter, LogLevel, NoopReporter, Reporter, Stage, SyncLogEvent, SyncProgressEvent,
};
