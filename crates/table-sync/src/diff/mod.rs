//! Primary-key indexed diff of two table snapshots.
//!
//! Both snapshots are held in memory. Rows are matched on the printed form
//! of their primary-key value and compared column by column on the printed
//! form of each value:
//!
//! - key only in source → insert
//! - key on both sides, some column differs → update
//! - key on both sides, nothing differs → same
//! - key only in target → delete
//!
//! The partition is computed once and then projected into counts
//! ([`TableDiffSummary`]), samples ([`TableDiffPreview`]) or writes
//! ([`ChangeSet`]).

pub mod types;

pub use types::{
    effective_preview_limit, AnalyzeResult, TableDiffPreview, TableDiffSummary, UpdatePreview,
    DEFAULT_PREVIEW_LIMIT, MAX_PREVIEW_LIMIT,
};

use std::collections::{HashMap, HashSet};

use crate::config::{PkSelection, TableOptions};
use crate::core::value::{display_or_null, NULL_DISPLAY};
use crate::core::{ChangeSet, Row, RowUpdate, SqlValue};

/// A source row matched to a target row with at least one differing column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedRow {
    pub source_idx: usize,
    pub target_idx: usize,
    pub changed_columns: Vec<String>,
}

/// Indexes into the two snapshots, split by outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffPartition {
    /// Source rows with no target counterpart.
    pub inserts: Vec<usize>,
    /// Matched rows that differ.
    pub updates: Vec<ChangedRow>,
    /// Target rows with no source counterpart.
    pub deletes: Vec<usize>,
    /// Matched rows that are identical.
    pub same: usize,
}

/// Identity of a row, or `None` when its key is missing, NULL or empty.
pub fn row_key(row: &Row, pk: &str) -> Option<String> {
    lookup(row, pk).and_then(SqlValue::pk_key)
}

/// Printed key of a row for allow-list matching; unusable keys print as NULL.
fn key_or_null(row: &Row, pk: &str) -> String {
    row_key(row, pk).unwrap_or_else(|| NULL_DISPLAY.to_string())
}

/// Column lookup falling back to a case-insensitive match.
fn lookup<'r>(row: &'r Row, column: &str) -> Option<&'r SqlValue> {
    row.get(column).or_else(|| {
        row.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    })
}

/// Non-key source columns whose printed value differs on the target.
pub fn changed_columns(pk: &str, source: &Row, target: &Row) -> Vec<String> {
    source
        .iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case(pk))
        .filter(|(name, value)| value.to_string() != display_or_null(lookup(target, name)))
        .map(|(name, _)| name.clone())
        .collect()
}

/// Partition two snapshots by primary key.
///
/// Source order is preserved for inserts and updates, target order for deletes.
pub fn partition(pk: &str, source: &[Row], target: &[Row]) -> DiffPartition {
    let target_index: HashMap<String, usize> = target
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| row_key(row, pk).map(|key| (key, idx)))
        .collect();

    let mut matched: HashSet<usize> = HashSet::with_capacity(target_index.len());
    let mut result = DiffPartition::default();

    for (source_idx, source_row) in source.iter().enumerate() {
        let hit = row_key(source_row, pk).and_then(|key| target_index.get(&key).copied());
        match hit {
            None => result.inserts.push(source_idx),
            Some(target_idx) => {
                matched.insert(target_idx);
                let changed = changed_columns(pk, source_row, &target[target_idx]);
                if changed.is_empty() {
                    result.same += 1;
                } else {
                    result.updates.push(ChangedRow {
                        source_idx,
                        target_idx,
                        changed_columns: changed,
                    });
                }
            }
        }
    }

    // Iterate the index, not the whole snapshot: rows with unusable keys never delete.
    let mut deletes: Vec<usize> = target_index
        .values()
        .copied()
        .filter(|idx| !matched.contains(idx))
        .collect();
    deletes.sort_unstable();
    result.deletes = deletes;

    result
}

impl DiffPartition {
    /// Counts-only projection.
    pub fn summarize(&self, table: &str, pk: &str) -> TableDiffSummary {
        TableDiffSummary {
            table: table.to_string(),
            pk_column: pk.to_string(),
            can_sync: true,
            inserts: self.inserts.len(),
            updates: self.updates.len(),
            deletes: self.deletes.len(),
            same: self.same,
            message: String::new(),
        }
    }

    /// Sample projection with at most `limit` rows per partition.
    pub fn preview(
        &self,
        table: &str,
        pk: &str,
        source: &[Row],
        target: &[Row],
        limit: usize,
    ) -> TableDiffPreview {
        TableDiffPreview {
            table: table.to_string(),
            pk_column: pk.to_string(),
            can_sync: true,
            message: String::new(),
            total_inserts: self.inserts.len(),
            total_updates: self.updates.len(),
            total_deletes: self.deletes.len(),
            inserts: self
                .inserts
                .iter()
                .take(limit)
                .map(|&i| source[i].clone())
                .collect(),
            updates: self
                .updates
                .iter()
                .take(limit)
                .map(|u| UpdatePreview {
                    pk: key_or_null(&source[u.source_idx], pk),
                    changed_columns: u.changed_columns.clone(),
                    source: source[u.source_idx].clone(),
                    target: target[u.target_idx].clone(),
                })
                .collect(),
            deletes: self
                .deletes
                .iter()
                .take(limit)
                .map(|&i| target[i].clone())
                .collect(),
        }
    }

    /// Write projection.
    ///
    /// Inserts carry the full source row, updates the key plus changed
    /// columns, deletes the key only. Deletes are included only when
    /// `include_deletes` is set.
    pub fn into_change_set(
        self,
        pk: &str,
        source: &[Row],
        target: &[Row],
        include_deletes: bool,
    ) -> ChangeSet {
        let key_row = |row: &Row| -> Row {
            lookup(row, pk)
                .map(|v| Row::from([(pk.to_string(), v.clone())]))
                .unwrap_or_default()
        };

        let inserts = self.inserts.iter().map(|&i| source[i].clone()).collect();
        let updates = self
            .updates
            .iter()
            .map(|u| {
                let src = &source[u.source_idx];
                RowUpdate {
                    keys: key_row(src),
                    values: u
                        .changed_columns
                        .iter()
                        .filter_map(|c| src.get(c).map(|v| (c.clone(), v.clone())))
                        .collect(),
                }
            })
            .collect();
        let deletes = if include_deletes {
            self.deletes.iter().map(|&i| key_row(&target[i])).collect()
        } else {
            Vec::new()
        };

        ChangeSet {
            inserts,
            updates,
            deletes,
        }
    }
}

/// Every source row as an insert (insert-only and full-overwrite modes).
pub fn all_inserts(source: Vec<Row>) -> ChangeSet {
    ChangeSet {
        inserts: source,
        ..ChangeSet::default()
    }
}

/// Keep only the operations and rows a table's options select.
///
/// Disabled operations are emptied; enabled ones are narrowed by their
/// allow-list, where an empty list keeps everything.
pub fn filter_by_options(mut changes: ChangeSet, pk: &str, opts: &TableOptions) -> ChangeSet {
    if opts.insert {
        let allow = PkSelection::from_list(&opts.selected_insert_pks);
        if !allow.is_all() {
            changes.inserts.retain(|r| allow.allows(&key_or_null(r, pk)));
        }
    } else {
        changes.inserts.clear();
    }

    if opts.update {
        let allow = PkSelection::from_list(&opts.selected_update_pks);
        if !allow.is_all() {
            changes.updates.retain(|u| allow.allows(&key_or_null(&u.keys, pk)));
        }
    } else {
        changes.updates.clear();
    }

    if opts.delete {
        let allow = PkSelection::from_list(&opts.selected_delete_pks);
        if !allow.is_all() {
            changes.deletes.retain(|r| allow.allows(&key_or_null(r, pk)));
        }
    } else {
        changes.deletes.clear();
    }

    changes
}
