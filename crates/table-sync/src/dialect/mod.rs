//! Engine families and the SQL differences the engine cares about.
//!
//! Drivers are keyed by their exact type name ("mysql", "kingbase", ...), but
//! the statements the engine builds only differ per *family*: how
//! identifiers are quoted, what the default schema is, and which DDL
//! shortcuts exist.

use crate::core::identifier::{quote_ansi, quote_mssql, quote_mysql};
use crate::error::Result;

/// A group of engines sharing SQL syntax and schema semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectFamily {
    /// MySQL and wire-compatible engines. The database *is* the schema.
    Mysql,
    /// PostgreSQL and its forks. Tables live in `public` unless qualified.
    Postgres,
    /// Microsoft SQL Server. Tables live in `dbo` unless qualified.
    SqlServer,
    /// SQLite and other embedded engines with a `main` schema.
    Sqlite,
    /// Oracle-like engines where the schema is the connecting user/database.
    Oracle,
    /// Anything else; treated like Oracle with ANSI quoting.
    Other,
}

impl DialectFamily {
    /// Resolve the family of a database type string.
    pub fn from_db_type(db_type: &str) -> Self {
        match db_type.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" | "tidb" | "doris" | "starrocks" | "oceanbase" => {
                DialectFamily::Mysql
            }
            "postgres" | "postgresql" | "pg" | "kingbase" | "highgo" | "vastbase"
            | "opengauss" => DialectFamily::Postgres,
            "sqlserver" | "mssql" | "sql_server" => DialectFamily::SqlServer,
            "sqlite" | "sqlite3" | "duckdb" => DialectFamily::Sqlite,
            "oracle" | "dameng" | "dm" => DialectFamily::Oracle,
            _ => DialectFamily::Other,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DialectFamily::Mysql => "mysql",
            DialectFamily::Postgres => "postgres",
            DialectFamily::SqlServer => "sqlserver",
            DialectFamily::Sqlite => "sqlite",
            DialectFamily::Oracle => "oracle",
            DialectFamily::Other => "other",
        }
    }

    /// Quote an identifier.
    ///
    /// - MySQL: `` `identifier` ``
    /// - SQL Server: `[identifier]`
    /// - everything else: `"identifier"`
    pub fn quote_ident(self, name: &str) -> Result<String> {
        match self {
            DialectFamily::Mysql => quote_mysql(name),
            DialectFamily::SqlServer => quote_mssql(name),
            _ => quote_ansi(name),
        }
    }

    /// Schema used when a table name carries none.
    ///
    /// `None` means the connection's database name is used instead.
    pub fn default_schema(self) -> Option<&'static str> {
        match self {
            DialectFamily::Postgres => Some("public"),
            DialectFamily::SqlServer => Some("dbo"),
            DialectFamily::Sqlite => Some("main"),
            DialectFamily::Mysql | DialectFamily::Oracle | DialectFamily::Other => None,
        }
    }

    /// Whether `CREATE TABLE` text read from one engine of this family can be
    /// replayed verbatim on another.
    pub fn supports_create_from_source_ddl(self) -> bool {
        matches!(self, DialectFamily::Mysql)
    }

    /// Whether `ALTER TABLE ... ADD COLUMN` is available.
    pub fn supports_add_column(self) -> bool {
        matches!(
            self,
            DialectFamily::Mysql | DialectFamily::Postgres | DialectFamily::Sqlite
        )
    }

    pub fn supports_truncate(self) -> bool {
        !matches!(self, DialectFamily::Sqlite)
    }

    /// Column type used for added columns when the source type cannot be reused.
    pub fn wide_text_type(self) -> &'static str {
        match self {
            DialectFamily::Mysql => "LONGTEXT",
            _ => "TEXT",
        }
    }

    fn is_default_schema(self, schema: &str) -> bool {
        self.default_schema()
            .is_some_and(|d| d.eq_ignore_ascii_case(schema))
    }
}

impl std::fmt::Display for DialectFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Split a possibly qualified table name into `(schema, table)`.
///
/// A dotted name is split on its first dot. Otherwise families with a
/// default schema use it, and the rest use `database` unchanged.
pub fn normalize_schema_and_table(db_type: &str, database: &str, table: &str) -> (String, String) {
    let table = table.trim();
    if let Some((schema, name)) = table.split_once('.') {
        return (schema.trim().to_string(), name.trim().to_string());
    }

    let family = DialectFamily::from_db_type(db_type);
    let schema = family
        .default_schema()
        .map_or_else(|| database.trim().to_string(), str::to_string);
    (schema, table.to_string())
}

/// Quoted table reference as used in `SELECT`/`ALTER` statements.
///
/// Families with an implicit default schema get the bare table name unless
/// the schema differs from the default.
pub fn qualified_table_name(db_type: &str, schema: &str, table: &str) -> Result<String> {
    let family = DialectFamily::from_db_type(db_type);
    let schema = schema.trim();
    if schema.is_empty() || family.is_default_schema(schema) {
        return family.quote_ident(table);
    }
    Ok(format!(
        "{}.{}",
        family.quote_ident(schema)?,
        family.quote_ident(table)?
    ))
}

/// `SELECT *` over a whole table.
pub fn select_all_sql(qualified_table: &str) -> String {
    format!("SELECT * FROM {}", qualified_table)
}

/// Statement that removes every row of a table.
pub fn clear_table_sql(db_type: &str, qualified_table: &str) -> String {
    if DialectFamily::from_db_type(db_type).supports_truncate() {
        format!("TRUNCATE TABLE {}", qualified_table)
    } else {
        format!("DELETE FROM {}", qualified_table)
    }
}

/// Type for a column added to the target.
///
/// The source's native type is reused within one family; across families a
/// wide text column is used so any value fits.
pub fn added_column_type(source_type: &str, target_type: &str, native: &str) -> String {
    let source = DialectFamily::from_db_type(source_type);
    let target = DialectFamily::from_db_type(target_type);
    if source == target && !native.trim().is_empty() {
        native.trim().to_string()
    } else {
        target.wide_text_type().to_string()
    }
}

/// `ALTER TABLE ... ADD COLUMN` for a nullable column without default.
///
/// Returns `Ok(None)` when the target family has no such statement.
pub fn add_column_sql(
    db_type: &str,
    qualified_table: &str,
    column: &str,
    column_type: &str,
) -> Result<Option<String>> {
    let family = DialectFamily::from_db_type(db_type);
    let col = family.quote_ident(column)?;
    let sql = match family {
        DialectFamily::Mysql | DialectFamily::Postgres => format!(
            "ALTER TABLE {} ADD COLUMN {} {} NULL",
            qualified_table, col, column_type
        ),
        DialectFamily::Sqlite => format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            qualified_table, col, column_type
        ),
        DialectFamily::SqlServer | DialectFamily::Oracle | DialectFamily::Other => {
            return Ok(None)
        }
    };
    Ok(Some(sql))
}
