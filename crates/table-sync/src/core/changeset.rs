//! Insert/update/delete partitions handed to a [`BatchApplier`](super::BatchApplier).

use std::collections::BTreeMap;

use serde::Serialize;

use super::value::Row;

/// An update of one row: the key identifying it and the columns that changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowUpdate {
    /// Primary key column to value.
    pub keys: Row,

    /// Changed non-key columns with their new (source) values.
    pub values: Row,
}

/// The writes needed to make a target table match its source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeSet {
    /// Full source rows missing from the target.
    pub inserts: Vec<Row>,

    /// Rows present on both sides with at least one differing column.
    pub updates: Vec<RowUpdate>,

    /// Key-only rows present on the target but not the source.
    pub deletes: Vec<Row>,
}

impl ChangeSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Total number of row operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }

    /// Columns written by inserts and update value sets, keyed by lower-cased
    /// name. The first spelling seen is kept as the value.
    pub fn written_columns(&self) -> BTreeMap<String, String> {
        let mut cols = BTreeMap::new();
        let names = self
            .inserts
            .iter()
            .flat_map(|r| r.keys())
            .chain(self.updates.iter().flat_map(|u| u.values.keys()));
        for name in names {
            cols.entry(name.to_lowercase())
                .or_insert_with(|| name.clone());
        }
        cols
    }

    /// Drop columns rejected by `keep` from inserts and update value sets.
    ///
    /// Update key sets and deletes are left alone. Updates left with no
    /// values are removed. Returns how many column values were dropped.
    pub fn retain_columns<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let mut dropped = 0;
        for row in &mut self.inserts {
            let before = row.len();
            row.retain(|name, _| keep(name));
            dropped += before - row.len();
        }
        for update in &mut self.updates {
            let before = update.values.len();
            update.values.retain(|name, _| keep(name));
            dropped += before - update.values.len();
        }
        self.updates.retain(|u| !u.values.is_empty());
        dropped
    }
}
