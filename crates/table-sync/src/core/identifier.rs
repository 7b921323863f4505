//! Identifier validation and quoting.
//!
//! SQL identifiers (table names, column names, schema names) cannot be bound
//! as parameters, so every statement the engine builds quotes them here:
//! 1. Validate the identifier (null bytes, empty, excessive length)
//! 2. Apply engine-specific quoting (double quotes, backticks, brackets)
//! 3. Escape the quote character inside the name

use crate::error::{Result, SyncError};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - SQL Server: 128 characters
/// - MySQL: 64 characters
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier for security issues.
///
/// # Errors
///
/// Returns `SyncError::Identifier` for empty names, names containing a null
/// byte, and names longer than 128 bytes.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SyncError::Identifier(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(SyncError::Identifier(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(SyncError::Identifier(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote with ANSI double quotes (PostgreSQL, SQLite, Oracle).
pub fn quote_ansi(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Quote a MySQL identifier using backticks.
pub fn quote_mysql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Quote a SQL Server identifier using brackets.
pub fn quote_mssql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("[{}]", name.replace(']', "]]")))
}
