//! Target table and column reconciliation.
//!
//! Two jobs, both additive:
//!
//! - make sure the target table exists, creating it from the source's own
//!   DDL when both engines speak the same DDL
//! - make sure every column a change set writes exists on the target,
//!   adding it as a nullable column when allowed, and otherwise removing it
//!   from the change set
//!
//! Target columns are never dropped or renamed.

use std::collections::HashSet;

use tracing::debug;

use crate::core::{ChangeSet, ColumnDefinition, Database};
use crate::dialect::{add_column_sql, added_column_type, DialectFamily};
use crate::error::{Result, SyncError};
use crate::reporter::JobLog;

/// Where a table lives on each side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLocation {
    /// Name as given by the caller, used in messages.
    pub display: String,
    pub source_schema: String,
    pub source_table: String,
    /// Quoted source reference for statements.
    pub source_qualified: String,
    pub target_schema: String,
    pub target_table: String,
    /// Quoted target reference for statements.
    pub target_qualified: String,
}

/// Outcome of [`SchemaAligner::ensure_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableCreation {
    AlreadyExists,
    Created,
}

/// Outcome of [`SchemaAligner::align_columns`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnAlignment {
    /// Columns added to the target.
    pub added: Vec<String>,
    /// Columns removed from the change set because the target lacks them.
    pub dropped: Vec<String>,
}

/// Reconciles a target table with what a sync needs.
pub(crate) struct SchemaAligner<'a> {
    source: &'a dyn Database,
    target: &'a dyn Database,
    auto_add_columns: bool,
}

impl<'a> SchemaAligner<'a> {
    pub(crate) fn new(source: &'a dyn Database, target: &'a dyn Database, auto_add_columns: bool) -> Self {
        Self {
            source,
            target,
            auto_add_columns,
        }
    }

    fn source_family(&self) -> DialectFamily {
        DialectFamily::from_db_type(self.source.db_type())
    }

    fn target_family(&self) -> DialectFamily {
        DialectFamily::from_db_type(self.target.db_type())
    }

    /// Target columns; an empty list means the table does not exist.
    async fn target_columns(&self, loc: &TableLocation) -> Result<Vec<ColumnDefinition>> {
        self.target
            .get_columns(&loc.target_schema, &loc.target_table)
            .await
    }

    /// Create the target table from the source DDL if it is missing.
    ///
    /// # Errors
    ///
    /// [`SyncError::UnsupportedDdl`] when the table is missing and the engines
    /// do not share DDL; [`SyncError::Schema`] when reading or replaying the
    /// DDL fails.
    pub(crate) async fn ensure_table(&self, loc: &TableLocation, log: &mut JobLog<'_>) -> Result<TableCreation> {
        match self.target_columns(loc).await {
            Ok(cols) if !cols.is_empty() => {
                log.info(format!("Target table {} already exists", loc.display));
                return Ok(TableCreation::AlreadyExists);
            }
            Ok(_) => {}
            Err(e) => debug!("Reading target columns of {} failed: {}", loc.display, e),
        }

        let (source_family, target_family) = (self.source_family(), self.target_family());
        if !(source_family.supports_create_from_source_ddl()
            && target_family.supports_create_from_source_ddl())
        {
            return Err(SyncError::UnsupportedDdl {
                source_type: self.source.db_type().to_string(),
                target_type: self.target.db_type().to_string(),
            });
        }

        let ddl = self
            .source
            .get_create_statement(&loc.source_schema, &loc.source_table)
            .await
            .map_err(|e| SyncError::schema(&loc.display, format!("reading source DDL: {}", e)))?;
        if ddl.trim().is_empty() {
            return Err(SyncError::schema(&loc.display, "source returned an empty CREATE statement"));
        }

        debug!("Creating {} with: {}", loc.display, ddl);
        self.target
            .exec(&ddl)
            .await
            .map_err(|e| SyncError::schema(&loc.display, format!("creating target table: {}", e)))?;

        log.info(format!("Created target table {} from source DDL", loc.display));
        Ok(TableCreation::Created)
    }

    /// Make the target able to take every column `changes` writes.
    ///
    /// Missing columns are added when auto-add is on and the target supports
    /// `ADD COLUMN`; any column still missing afterwards is removed from the
    /// inserts and update value sets.
    ///
    /// # Errors
    ///
    /// [`SyncError::Schema`] when the target table cannot be found or its
    /// columns cannot be read.
    pub(crate) async fn align_columns(
        &self,
        loc: &TableLocation,
        source_columns: &[ColumnDefinition],
        changes: &mut ChangeSet,
        log: &mut JobLog<'_>,
    ) -> Result<ColumnAlignment> {
        let mut outcome = ColumnAlignment::default();
        if changes.inserts.is_empty() && changes.updates.is_empty() {
            return Ok(outcome);
        }

        let target_cols = self.target_columns(loc).await.map_err(|e| {
            SyncError::schema(&loc.display, format!("reading target columns: {}", e))
        })?;
        if target_cols.is_empty() {
            return Err(SyncError::schema(&loc.display, "target table not found"));
        }
        let mut existing: HashSet<String> =
            target_cols.iter().map(|c| c.name.to_lowercase()).collect();

        let missing: Vec<String> = changes
            .written_columns()
            .into_iter()
            .filter(|(lower, _)| !existing.contains(lower))
            .map(|(_, name)| name)
            .collect();
        if missing.is_empty() {
            return Ok(outcome);
        }

        let can_add = self.target_family().supports_add_column();
        if self.auto_add_columns && !can_add {
            log.warn(format!(
                "Target {} does not support ADD COLUMN; {} column(s) of {} cannot be added",
                self.target.db_type(),
                missing.len(),
                loc.display
            ));
        }

        for name in missing {
            if self.auto_add_columns && can_add {
                match self.add_column(loc, source_columns, &name).await {
                    Ok(col_type) => {
                        log.info(format!(
                            "Added column {}.{} ({}, nullable)",
                            loc.display, name, col_type
                        ));
                        existing.insert(name.to_lowercase());
                        outcome.added.push(name);
                        continue;
                    }
                    Err(e) => log.warn(format!(
                        "Failed to add column {}.{}: {}",
                        loc.display, name, e
                    )),
                }
            } else if !self.auto_add_columns {
                log.warn(format!(
                    "Column {} is missing on target table {}; enable auto add columns to create it",
                    name, loc.display
                ));
            }
            outcome.dropped.push(name);
        }

        if !outcome.dropped.is_empty() {
            let dropped = changes.retain_columns(|c| existing.contains(&c.to_lowercase()));
            log.warn(format!(
                "Skipping {} value(s) of column(s) [{}] not present on target table {}",
                dropped,
                outcome.dropped.join(", "),
                loc.display
            ));
        }

        Ok(outcome)
    }

    async fn add_column(
        &self,
        loc: &TableLocation,
        source_columns: &[ColumnDefinition],
        name: &str,
    ) -> Result<String> {
        let native = source_columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.data_type.as_str())
            .unwrap_or_default();
        let col_type = added_column_type(self.source.db_type(), self.target.db_type(), native);
        let sql = add_column_sql(self.target.db_type(), &loc.target_qualified, name, &col_type)?
            .ok_or_else(|| {
                SyncError::schema(&loc.display, "target does not support ADD COLUMN")
            })?;
        debug!("Adding column: {}", sql);
        self.target.exec(&sql).await?;
        Ok(col_type)
    }
}
