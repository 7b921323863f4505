//! Configuration validation.

use super::SyncConfig;
use crate::error::{Result, SyncError};
use std::collections::HashSet;

/// Validate the configuration.
pub fn validate(config: &SyncConfig) -> Result<()> {
    if config.source.r#type.trim().is_empty() {
        return Err(SyncError::Config("source.type is required".into()));
    }
    if config.target.r#type.trim().is_empty() {
        return Err(SyncError::Config("target.type is required".into()));
    }

    let mut seen = HashSet::new();
    for table in &config.tables {
        let name = table.trim();
        if name.is_empty() {
            return Err(SyncError::Config("tables cannot contain an empty name".into()));
        }
        if name.contains('\0') {
            return Err(SyncError::Config(format!(
                "table name contains null byte: {:?}",
                table
            )));
        }
        if !seen.insert(name.to_string()) {
            return Err(SyncError::Config(format!("table '{}' is listed twice", name)));
        }
    }

    let mut configured = HashSet::new();
    for name in config.table_options.keys() {
        if !seen.contains(name.trim()) {
            return Err(SyncError::Config(format!(
                "table_options has an entry for '{}' which is not in tables",
                name
            )));
        }
        if !configured.insert(name.trim()) {
            return Err(SyncError::Config(format!(
                "table_options has more than one entry for '{}'",
                name.trim()
            )));
        }
    }

    Ok(())
}
