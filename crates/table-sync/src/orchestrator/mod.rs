//! Sync orchestrator - per-job workflow coordinator.
//!
//! Every entry point opens one connection per side, walks the requested
//! tables one after another, and closes both connections before returning.
//! Only resolving a driver or opening a connection can fail a whole job;
//! anything that goes wrong inside a table is logged, recorded against that
//! table, and the loop moves on.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::{SyncConfig, SyncMode};
use crate::core::{single_primary_key, ColumnDefinition, Database, DriverCatalog, Row};
use crate::diff::{
    all_inserts, effective_preview_limit, filter_by_options, partition, AnalyzeResult,
    TableDiffPreview, TableDiffSummary,
};
use crate::dialect::{
    clear_table_sql, normalize_schema_and_table, qualified_table_name, select_all_sql,
};
use crate::error::{Result, Side, SyncError};
use crate::reporter::{JobLog, NoopReporter, Reporter, Stage};
use crate::schema_align::{SchemaAligner, TableLocation};

/// Result of a sync run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub job_id: String,

    /// False only when the job could not start (driver or connection failure).
    pub success: bool,

    pub message: String,

    /// Tables whose sync completed.
    pub tables_synced: usize,

    pub rows_inserted: usize,
    pub rows_updated: usize,
    pub rows_deleted: usize,

    /// Outcome of every requested table, in request order.
    pub tables: Vec<TableSyncReport>,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    /// Every log line of the job, in order.
    pub logs: Vec<String>,
}

impl SyncResult {
    /// Serialize to pretty JSON for the host.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Names of tables that failed.
    pub fn failed_tables(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| t.status == TableStatus::Failed)
            .map(|t| t.table.as_str())
            .collect()
    }
}

/// How a table ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Synced,
    Skipped,
    Failed,
}

/// Outcome of one table in a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSyncReport {
    pub table: String,
    pub status: TableStatus,
    pub message: String,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl TableSyncReport {
    fn synced(table: &str, counts: ApplyCounts, message: impl Into<String>) -> Self {
        Self {
            table: table.to_string(),
            status: TableStatus::Synced,
            message: message.into(),
            inserted: counts.inserted,
            updated: counts.updated,
            deleted: counts.deleted,
        }
    }

    fn skipped(table: &str, message: impl Into<String>) -> Self {
        Self {
            table: table.to_string(),
            status: TableStatus::Skipped,
            message: message.into(),
            inserted: 0,
            updated: 0,
            deleted: 0,
        }
    }

    fn failed(table: &str, message: impl Into<String>) -> Self {
        Self {
            status: TableStatus::Failed,
            ..Self::skipped(table, message)
        }
    }
}

/// Result of a connection check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    pub source_connected: bool,
    pub source_latency_ms: u64,
    pub source_error: Option<String>,
    pub target_connected: bool,
    pub target_latency_ms: u64,
    pub target_error: Option<String>,
    pub healthy: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ApplyCounts {
    inserted: usize,
    updated: usize,
    deleted: usize,
}

/// The two open connections of a job.
struct Connections {
    source: Box<dyn Database>,
    target: Box<dyn Database>,
}

/// Drives analyze, preview and sync jobs.
///
/// Holds no per-job state; independent jobs may run concurrently.
pub struct SyncEngine {
    catalog: DriverCatalog,
    reporter: Arc<dyn Reporter>,
}

impl SyncEngine {
    /// Create an engine that resolves drivers from `catalog` and discards events.
    pub fn new(catalog: DriverCatalog) -> Self {
        Self {
            catalog,
            reporter: Arc::new(NoopReporter),
        }
    }

    /// Send log and progress events to `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Count the inserts, updates and deletes each table would need.
    pub async fn analyze(&self, config: &SyncConfig) -> AnalyzeResult {
        let job_id = job_id_for(config);
        let mut log = JobLog::new(job_id, self.reporter.as_ref(), config.tables.len());

        let mut conns = match self.open(config, &mut log).await {
            Ok(c) => c,
            Err(e) => {
                return AnalyzeResult {
                    success: false,
                    message: e.to_string(),
                    tables: Vec::new(),
                }
            }
        };

        let mut tables = Vec::with_capacity(config.tables.len());
        for (index, table) in config.tables.iter().enumerate() {
            log.progress(index, table, Stage::Diff);
            let summary = match self.analyze_table(&conns, config, table, &mut log).await {
                Ok(summary) => summary,
                Err(e) => {
                    log.error(format!("Analyze of {} failed: {}", table, e));
                    TableDiffSummary::failed(table.trim(), e.to_string())
                }
            };
            log.progress(index, table, Stage::Done);
            tables.push(summary);
        }

        self.close(&mut conns, &mut log).await;
        log.finished();

        AnalyzeResult {
            success: true,
            message: format!("Analyzed {} table(s)", tables.len()),
            tables,
        }
    }

    /// Sample the differences of one table.
    ///
    /// `limit` caps each partition; 0 selects the default.
    pub async fn preview(&self, config: &SyncConfig, table: &str, limit: usize) -> TableDiffPreview {
        let limit = effective_preview_limit(limit);
        let mut log = JobLog::new(job_id_for(config), self.reporter.as_ref(), 1);

        let mut conns = match self.open(config, &mut log).await {
            Ok(c) => c,
            Err(e) => return TableDiffPreview::failed(table.trim(), e.to_string()),
        };

        let preview = match self.preview_table(&conns, config, table, limit).await {
            Ok(p) => p,
            Err(e) => {
                log.error(format!("Preview of {} failed: {}", table, e));
                TableDiffPreview::failed(table.trim(), e.to_string())
            }
        };

        self.close(&mut conns, &mut log).await;
        preview
    }

    /// Synchronize every requested table.
    pub async fn run_sync(&self, config: &SyncConfig) -> SyncResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let job_id = job_id_for(config);
        let total = config.tables.len();
        let mut log = JobLog::new(job_id.clone(), self.reporter.as_ref(), total);

        log.info(format!(
            "Starting sync of {} table(s) ({} -> {}, mode: {}, content: {:?})",
            total,
            config.source.db_type(),
            config.target.db_type(),
            config.mode,
            config.content
        ));

        let mut result = SyncResult {
            job_id,
            success: false,
            message: String::new(),
            tables_synced: 0,
            rows_inserted: 0,
            rows_updated: 0,
            rows_deleted: 0,
            tables: Vec::with_capacity(total),
            started_at,
            completed_at: started_at,
            logs: Vec::new(),
        };

        let mut conns = match self.open(config, &mut log).await {
            Ok(c) => c,
            Err(e) => {
                log.error(format!("Sync aborted: {}", e));
                result.message = e.to_string();
                result.completed_at = Utc::now();
                result.logs = log.into_lines();
                return result;
            }
        };

        if config.content.includes_data() && conns.target.batch_applier().is_none() {
            log.warn(format!(
                "Target driver '{}' cannot apply change sets; row changes will not be written",
                conns.target.db_type()
            ));
        }

        for (index, table) in config.tables.iter().enumerate() {
            let report = match self.sync_table(&conns, config, index, table, &mut log).await {
                Ok(report) => {
                    let stage = if report.status == TableStatus::Synced {
                        Stage::Done
                    } else {
                        Stage::Skip
                    };
                    log.progress(index, table, stage);
                    report
                }
                Err(e) => {
                    log.error(format!("Table {} failed: {}", table, e));
                    log.progress(index, table, Stage::Error);
                    TableSyncReport::failed(table.trim(), e.to_string())
                }
            };

            if report.status == TableStatus::Synced {
                result.tables_synced += 1;
                result.rows_inserted += report.inserted;
                result.rows_updated += report.updated;
                result.rows_deleted += report.deleted;
            }
            result.tables.push(report);
        }

        self.close(&mut conns, &mut log).await;

        let failed = result.failed_tables().len();
        result.success = true;
        result.message = format!(
            "Synced {}/{} table(s): {} inserted, {} updated, {} deleted",
            result.tables_synced, total, result.rows_inserted, result.rows_updated, result.rows_deleted
        );
        if failed > 0 {
            result.message.push_str(&format!(", {} failed", failed));
        }
        log.info(format!(
            "{} in {:.1}s",
            result.message,
            start.elapsed().as_secs_f64()
        ));
        log.finished();

        result.completed_at = Utc::now();
        result.logs = log.into_lines();
        result
    }

    /// Open and close both connections, timing each.
    pub async fn check_connections(&self, config: &SyncConfig) -> HealthCheckResult {
        let (source_connected, source_latency_ms, source_error) =
            self.probe(Side::Source, config).await;
        let (target_connected, target_latency_ms, target_error) =
            self.probe(Side::Target, config).await;

        HealthCheckResult {
            source_connected,
            source_latency_ms,
            source_error,
            target_connected,
            target_latency_ms,
            target_error,
            healthy: source_connected && target_connected,
        }
    }

    async fn probe(&self, side: Side, config: &SyncConfig) -> (bool, u64, Option<String>) {
        let conn_config = match side {
            Side::Source => &config.source,
            Side::Target => &config.target,
        };
        let start = Instant::now();
        match self.catalog.open(side, conn_config).await {
            Ok(mut db) => {
                let latency = start.elapsed().as_millis() as u64;
                if let Err(e) = db.close().await {
                    debug!("Closing {} after health check failed: {}", side, e);
                }
                (true, latency, None)
            }
            Err(e) => (false, start.elapsed().as_millis() as u64, Some(e.to_string())),
        }
    }

    async fn open(&self, config: &SyncConfig, log: &mut JobLog<'_>) -> Result<Connections> {
        let mut source = self.catalog.open(Side::Source, &config.source).await?;
        let target = match self.catalog.open(Side::Target, &config.target).await {
            Ok(t) => t,
            Err(e) => {
                if let Err(close_err) = source.close().await {
                    log.warn(format!("Failed to close source connection: {}", close_err));
                }
                return Err(e);
            }
        };
        debug!(
            job_id = log.job_id(),
            "Connected to {} source and {} target",
            source.db_type(),
            target.db_type()
        );
        Ok(Connections { source, target })
    }

    async fn close(&self, conns: &mut Connections, log: &mut JobLog<'_>) {
        if let Err(e) = conns.source.close().await {
            log.warn(format!("Failed to close source connection: {}", e));
        }
        if let Err(e) = conns.target.close().await {
            log.warn(format!("Failed to close target connection: {}", e));
        }
    }

    async fn analyze_table(
        &self,
        conns: &Connections,
        config: &SyncConfig,
        table: &str,
        log: &mut JobLog<'_>,
    ) -> Result<TableDiffSummary> {
        let loc = locate(config, table)?;
        let (pk, _) = resolve_pk(conns.source.as_ref(), &loc).await?;

        if !config.content.includes_data() {
            return Ok(TableDiffSummary {
                table: loc.display,
                pk_column: pk,
                can_sync: true,
                message: "Schema-only sync: row differences are not analyzed".to_string(),
                ..TableDiffSummary::default()
            });
        }

        let (source_rows, target_rows) = fetch_both(conns, &loc).await?;
        let summary = partition(&pk, &source_rows, &target_rows).summarize(&loc.display, &pk);
        log.info(format!(
            "{}: {} to insert, {} to update, {} to delete, {} unchanged",
            loc.display, summary.inserts, summary.updates, summary.deletes, summary.same
        ));
        Ok(summary)
    }

    async fn preview_table(
        &self,
        conns: &Connections,
        config: &SyncConfig,
        table: &str,
        limit: usize,
    ) -> Result<TableDiffPreview> {
        let loc = locate(config, table)?;
        let (pk, _) = resolve_pk(conns.source.as_ref(), &loc).await?;
        let (source_rows, target_rows) = fetch_both(conns, &loc).await?;
        Ok(partition(&pk, &source_rows, &target_rows).preview(
            &loc.display,
            &pk,
            &source_rows,
            &target_rows,
            limit,
        ))
    }

    async fn sync_table(
        &self,
        conns: &Connections,
        config: &SyncConfig,
        index: usize,
        table: &str,
        log: &mut JobLog<'_>,
    ) -> Result<TableSyncReport> {
        let loc = locate(config, table)?;
        let aligner = SchemaAligner::new(
            conns.source.as_ref(),
            conns.target.as_ref(),
            config.auto_add_columns,
        );

        if config.content.includes_schema() {
            log.progress(index, &loc.display, Stage::Schema);
            aligner.ensure_table(&loc, log).await?;
        }

        if !config.content.includes_data() {
            log.info(format!("{}: schema synchronized, data sync not requested", loc.display));
            return Ok(TableSyncReport::synced(
                &loc.display,
                ApplyCounts::default(),
                "schema only",
            ));
        }

        let (pk, source_columns) = match resolve_pk(conns.source.as_ref(), &loc).await {
            Ok(found) => found,
            Err(e @ (SyncError::NoPrimaryKey(_) | SyncError::CompositePrimaryKey { .. })) => {
                log.warn(format!("Skipping {}: {}", loc.display, e));
                return Ok(TableSyncReport::skipped(&loc.display, e.to_string()));
            }
            Err(e) => return Err(e),
        };

        let opts = config.options_for(table.trim());
        if opts.is_disabled() {
            log.info(format!("Skipping {}: every operation is disabled", loc.display));
            return Ok(TableSyncReport::skipped(&loc.display, "all operations disabled"));
        }

        let mut changes = match config.mode {
            SyncMode::InsertUpdate => {
                log.progress(index, &loc.display, Stage::Fetch);
                let (source_rows, target_rows) = fetch_both(conns, &loc).await?;

                log.progress(index, &loc.display, Stage::Diff);
                let part = partition(&pk, &source_rows, &target_rows);
                let delete_note = if opts.delete || part.deletes.is_empty() {
                    ""
                } else {
                    " (deletes disabled, not applied)"
                };
                log.info(format!(
                    "{}: {} new, {} changed, {} missing from source{}, {} unchanged",
                    loc.display,
                    part.inserts.len(),
                    part.updates.len(),
                    part.deletes.len(),
                    delete_note,
                    part.same
                ));
                let changes = part.into_change_set(&pk, &source_rows, &target_rows, opts.delete);
                filter_by_options(changes, &pk, &opts)
            }
            SyncMode::InsertOnly | SyncMode::FullOverwrite => {
                if !opts.insert {
                    log.info(format!(
                        "Skipping {}: inserts are disabled and mode {} only inserts",
                        loc.display, config.mode
                    ));
                    return Ok(TableSyncReport::skipped(&loc.display, "inserts disabled"));
                }

                log.progress(index, &loc.display, Stage::Fetch);
                let source_rows = fetch(conns.source.as_ref(), &loc.source_qualified, Side::Source).await?;

                if config.mode == SyncMode::FullOverwrite {
                    let sql = clear_table_sql(conns.target.db_type(), &loc.target_qualified);
                    let cleared = conns.target.exec(&sql).await.map_err(|e| {
                        SyncError::Exec(format!("clearing target table {}: {}", loc.display, e))
                    })?;
                    log.warn(format!(
                        "Cleared target table {} ({} row(s) removed)",
                        loc.display, cleared
                    ));
                }

                log.progress(index, &loc.display, Stage::Diff);
                log.info(format!("{}: {} row(s) to insert", loc.display, source_rows.len()));
                all_inserts(source_rows)
            }
        };

        log.progress(index, &loc.display, Stage::Align);
        let alignment = aligner
            .align_columns(&loc, &source_columns, &mut changes, log)
            .await?;
        debug!(
            job_id = log.job_id(),
            "{}: columns added {:?}, dropped {:?}",
            loc.display,
            alignment.added,
            alignment.dropped
        );

        if changes.is_empty() {
            log.info(format!("{}: nothing to apply", loc.display));
            return Ok(TableSyncReport::synced(&loc.display, ApplyCounts::default(), "in sync"));
        }

        log.progress(index, &loc.display, Stage::Apply);
        let Some(applier) = conns.target.batch_applier() else {
            log.warn(format!(
                "{}: {} change(s) not applied, target driver has no batch writer",
                loc.display,
                changes.len()
            ));
            return Ok(TableSyncReport::skipped(&loc.display, "target cannot apply changes"));
        };

        applier
            .apply_changes(&loc.target_qualified, &changes)
            .await
            .map_err(|e| SyncError::apply(&loc.display, e.to_string()))?;

        let counts = ApplyCounts {
            inserted: changes.inserts.len(),
            updated: changes.updates.len(),
            deleted: changes.deletes.len(),
        };
        log.info(format!(
            "{}: applied {} insert(s), {} update(s), {} delete(s)",
            loc.display, counts.inserted, counts.updated, counts.deleted
        ));
        Ok(TableSyncReport::synced(&loc.display, counts, "applied"))
    }
}

fn job_id_for(config: &SyncConfig) -> String {
    if config.job_id.trim().is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        config.job_id.clone()
    }
}

/// Resolve schema, table, and quoted references on both sides.
fn locate(config: &SyncConfig, table: &str) -> Result<TableLocation> {
    let source_type = config.source.db_type();
    let target_type = config.target.db_type();
    let (source_schema, source_table) =
        normalize_schema_and_table(&source_type, &config.source.database, table);
    let (target_schema, target_table) =
        normalize_schema_and_table(&target_type, &config.target.database, table);

    Ok(TableLocation {
        display: table.trim().to_string(),
        source_qualified: qualified_table_name(&source_type, &source_schema, &source_table)?,
        target_qualified: qualified_table_name(&target_type, &target_schema, &target_table)?,
        source_schema,
        source_table,
        target_schema,
        target_table,
    })
}

/// The single primary-key column of the source table and all its columns.
async fn resolve_pk(
    source: &dyn Database,
    loc: &TableLocation,
) -> Result<(String, Vec<ColumnDefinition>)> {
    let columns = source
        .get_columns(&loc.source_schema, &loc.source_table)
        .await?;
    let pk = single_primary_key(&loc.display, &columns)?;
    Ok((pk, columns))
}

async fn fetch(db: &dyn Database, qualified: &str, side: Side) -> Result<Vec<Row>> {
    let sql = select_all_sql(qualified);
    debug!("Fetching {} snapshot: {}", side, sql);
    db.query(&sql)
        .await
        .map(|r| r.rows)
        .map_err(|e| SyncError::Query(format!("reading {} rows of {}: {}", side, qualified, e)))
}

async fn fetch_both(conns: &Connections, loc: &TableLocation) -> Result<(Vec<Row>, Vec<Row>)> {
    let source_rows = fetch(conns.source.as_ref(), &loc.source_qualified, Side::Source).await?;
    let target_rows = fetch(conns.target.as_ref(), &loc.target_qualified, Side::Target).await?;
    Ok((source_rows, target_rows))
}
