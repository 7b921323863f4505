//! Log and progress events for the host application.
//!
//! The engine calls the [`Reporter`] inline, in the same order as the steps
//! it describes. Hosts forward the events to their own transport under the
//! channel names below.

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

/// Emitted by the host when a job starts.
pub const EVENT_SYNC_START: &str = "sync:start";
/// Carries [`SyncProgressEvent`]s.
pub const EVENT_SYNC_PROGRESS: &str = "sync:progress";
/// Carries [`SyncLogEvent`]s.
pub const EVENT_SYNC_LOG: &str = "sync:log";
/// Emitted by the host with the final [`SyncResult`](crate::SyncResult).
pub const EVENT_SYNC_DONE: &str = "sync:done";

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Step of the per-table pipeline a progress event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Schema,
    Fetch,
    Diff,
    Align,
    Apply,
    Done,
    Skip,
    Error,
}

impl Stage {
    /// Share of a table's work completed when this stage is reached.
    fn fraction(self) -> f64 {
        match self {
            Stage::Schema => 0.1,
            Stage::Fetch => 0.3,
            Stage::Diff => 0.5,
            Stage::Align => 0.7,
            Stage::Apply => 0.9,
            Stage::Done | Stage::Skip | Stage::Error => 1.0,
        }
    }
}

/// A log line for the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLogEvent {
    pub job_id: String,
    pub level: LogLevel,
    pub message: String,
    /// Unix time in milliseconds.
    pub ts: i64,
}

/// Job progress for the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgressEvent {
    pub job_id: String,
    /// 0 to 100.
    pub percent: u8,
    /// 1-based index of the table being processed.
    pub current: usize,
    pub total: usize,
    pub table: String,
    pub stage: Stage,
}

/// Receives events while a job runs.
///
/// Calls are synchronous and made from the task running the job.
pub trait Reporter: Send + Sync {
    fn on_log(&self, event: &SyncLogEvent);

    fn on_progress(&self, event: &SyncProgressEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn on_log(&self, _event: &SyncLogEvent) {}

    fn on_progress(&self, _event: &SyncProgressEvent) {}
}

type LogHook = Box<dyn Fn(&SyncLogEvent) + Send + Sync>;
type ProgressHook = Box<dyn Fn(&SyncProgressEvent) + Send + Sync>;

/// Reporter built from a pair of closures.
pub struct CallbackReporter {
    on_log: LogHook,
    on_progress: ProgressHook,
}

impl CallbackReporter {
    pub fn new<L, P>(on_log: L, on_progress: P) -> Self
    where
        L: Fn(&SyncLogEvent) + Send + Sync + 'static,
        P: Fn(&SyncProgressEvent) + Send + Sync + 'static,
    {
        Self {
            on_log: Box::new(on_log),
            on_progress: Box::new(on_progress),
        }
    }
}

impl Reporter for CallbackReporter {
    fn on_log(&self, event: &SyncLogEvent) {
        (self.on_log)(event);
    }

    fn on_progress(&self, event: &SyncProgressEvent) {
        (self.on_progress)(event);
    }
}

/// Per-job event sink: keeps the transcript, mirrors lines to `tracing`,
/// and forwards everything to the reporter.
pub(crate) struct JobLog<'r> {
    job_id: String,
    reporter: &'r dyn Reporter,
    lines: Vec<String>,
    total: usize,
}

impl<'r> JobLog<'r> {
    pub(crate) fn new(job_id: impl Into<String>, reporter: &'r dyn Reporter, total: usize) -> Self {
        Self {
            job_id: job_id.into(),
            reporter,
            lines: Vec::new(),
            total,
        }
    }

    pub(crate) fn job_id(&self) -> &str {
        &self.job_id
    }

    pub(crate) fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message.into());
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message.into());
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message.into());
    }

    fn log(&mut self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => info!(job_id = %self.job_id, "{}", message),
            LogLevel::Warn => warn!(job_id = %self.job_id, "{}", message),
            LogLevel::Error => error!(job_id = %self.job_id, "{}", message),
        }
        self.lines.push(format!("[{}] {}", level, message));
        self.reporter.on_log(&SyncLogEvent {
            job_id: self.job_id.clone(),
            level,
            message,
            ts: Utc::now().timestamp_millis(),
        });
    }

    /// Report that table `index` (0-based) reached `stage`.
    pub(crate) fn progress(&self, index: usize, table: &str, stage: Stage) {
        self.reporter.on_progress(&SyncProgressEvent {
            job_id: self.job_id.clone(),
            percent: percent(index, self.total, stage),
            current: (index + 1).min(self.total.max(1)),
            total: self.total,
            table: table.to_string(),
            stage,
        });
    }

    /// Final 100% event.
    pub(crate) fn finished(&self) {
        self.reporter.on_progress(&SyncProgressEvent {
            job_id: self.job_id.clone(),
            percent: 100,
            current: self.total,
            total: self.total,
            table: String::new(),
            stage: Stage::Done,
        });
    }

    pub(crate) fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

fn percent(index: usize, total: usize, stage: Stage) -> u8 {
    if total == 0 {
        return 100;
    }
    let done = (index as f64 + stage.fraction()) / total as f64 * 100.0;
    done.round().clamp(0.0, 100.0) as u8
}
