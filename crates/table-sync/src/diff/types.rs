//! Read-only projections of a table diff.

use serde::Serialize;

use crate::core::Row;

/// Largest sample a preview returns per partition.
pub const MAX_PREVIEW_LIMIT: usize = 500;

/// Sample size used when the caller asks for none.
pub const DEFAULT_PREVIEW_LIMIT: usize = 200;

/// Clamp a requested preview size: 0 selects the default, larger values are capped.
pub fn effective_preview_limit(limit: usize) -> usize {
    if limit == 0 {
        DEFAULT_PREVIEW_LIMIT
    } else {
        limit.min(MAX_PREVIEW_LIMIT)
    }
}

/// Counts-only diff of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDiffSummary {
    pub table: String,
    pub pk_column: String,
    pub can_sync: bool,
    pub inserts: usize,
    pub updates: usize,
    pub deletes: usize,
    pub same: usize,
    pub message: String,
}

impl TableDiffSummary {
    /// A summary for a table that cannot be synchronized.
    pub fn failed(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn has_differences(&self) -> bool {
        self.inserts + self.updates + self.deletes > 0
    }
}

/// Job-level result of a dry-run analysis.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    pub success: bool,
    pub message: String,
    pub tables: Vec<TableDiffSummary>,
}

/// One row that would be updated, with both sides for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreview {
    pub pk: String,
    pub changed_columns: Vec<String>,
    pub source: Row,
    pub target: Row,
}

/// Bounded sample of a table diff for operator review.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDiffPreview {
    pub table: String,
    pub pk_column: String,
    pub can_sync: bool,
    pub message: String,
    pub total_inserts: usize,
    pub total_updates: usize,
    pub total_deletes: usize,
    pub inserts: Vec<Row>,
    pub updates: Vec<UpdatePreview>,
    pub deletes: Vec<Row>,
}

impl TableDiffPreview {
    /// A preview for a table that cannot be diffed.
    pub fn failed(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            message: message.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_preview_limit() {
        assert_eq!(effective_preview_limit(0), 200);
        assert_eq!(effective_preview_limit(10), 10);
        assert_eq!(effective_preview_limit(500), 500);
        assert_eq!(effective_preview_limit(10_000), 500);
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = TableDiffSummary {
            table: "users".into(),
            pk_column: "id".into(),
            can_sync: true,
            inserts: 1,
            ..TableDiffSummary::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["canSync"], true);
        assert_eq!(json["pkColumn"], "id");
        assert_eq!(json["inserts"], 1);
    }

    #[test]
    fn test_failed_summary() {
        let summary = TableDiffSummary::failed("logs", "no primary key");
        assert!(!summary.can_sync);
        assert!(!summary.has_differences());
        assert_eq!(summary.message, "no primary key");
    }
}
