//! Configuration type definitions for sync jobs.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Root configuration of one sync job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Connection the rows are read from.
    pub source: ConnectionConfig,

    /// Connection the rows are written to.
    pub target: ConnectionConfig,

    /// Tables to synchronize, optionally `schema.table`.
    #[serde(default)]
    pub tables: Vec<String>,

    /// What to synchronize (default: data).
    #[serde(default)]
    pub content: ContentMode,

    /// How rows are written (default: insert_update).
    #[serde(default)]
    pub mode: SyncMode,

    /// Correlation id for events. Generated when empty.
    #[serde(default)]
    pub job_id: String,

    /// Add columns the target lacks instead of dropping them from the change set.
    #[serde(default)]
    pub auto_add_columns: bool,

    /// Per-table operation switches and row selections.
    #[serde(default)]
    pub table_options: HashMap<String, TableOptions>,
}

impl SyncConfig {
    /// Create a config with default modes for the given tables.
    pub fn new(source: ConnectionConfig, target: ConnectionConfig, tables: Vec<String>) -> Self {
        Self {
            source,
            target,
            tables,
            content: ContentMode::default(),
            mode: SyncMode::default(),
            job_id: String::new(),
            auto_add_columns: false,
            table_options: HashMap::new(),
        }
    }

    /// Options for a table, falling back to defaults when none were given.
    ///
    /// Keys match after trimming surrounding whitespace.
    pub fn options_for(&self, table: &str) -> TableOptions {
        let table = table.trim();
        self.table_options
            .get(table)
            .or_else(|| {
                self.table_options
                    .iter()
                    .find(|(key, _)| key.trim() == table)
                    .map(|(_, opts)| opts)
            })
            .cloned()
            .unwrap_or_default()
    }
}

/// Connection descriptor handed to a driver.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database type (e.g. "mysql", "postgres", "sqlserver").
    pub r#type: String,

    /// Database host.
    #[serde(default)]
    pub host: String,

    /// Database port (0 means driver default).
    #[serde(default)]
    pub port: u16,

    /// Username.
    #[serde(default)]
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Database name. For MySQL-like engines this is also the schema.
    #[serde(default)]
    pub database: String,

    /// Full DSN, used by drivers in place of the discrete fields when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsn: Option<String>,

    /// Driver-specific extras (ssl mode, file path, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl ConnectionConfig {
    /// Create a descriptor for the given type and database.
    pub fn new(db_type: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            r#type: db_type.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Lower-cased database type.
    pub fn db_type(&self) -> String {
        self.r#type.trim().to_lowercase()
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("dsn", &self.dsn.as_ref().map(|_| "[REDACTED]"))
            .field("options", &self.options)
            .finish()
    }
}

/// What part of a table is synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    /// Rows only.
    #[default]
    Data,

    /// Table structure only.
    Schema,

    /// Structure first, then rows.
    Both,
}

impl ContentMode {
    pub fn includes_data(self) -> bool {
        matches!(self, ContentMode::Data | ContentMode::Both)
    }

    pub fn includes_schema(self) -> bool {
        matches!(self, ContentMode::Schema | ContentMode::Both)
    }
}

/// How source rows are written to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Diff both sides: INSERT new rows, UPDATE changed rows, optionally DELETE extra rows.
    #[default]
    InsertUpdate,

    /// Insert every source row without reading the target.
    InsertOnly,

    /// Clear the target table, then insert every source row.
    FullOverwrite,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::InsertUpdate => write!(f, "insert_update"),
            SyncMode::InsertOnly => write!(f, "insert_only"),
            SyncMode::FullOverwrite => write!(f, "full_overwrite"),
        }
    }
}

/// Per-table operation switches.
///
/// An empty `selected_*_pks` list selects every row of that kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    #[serde(default = "default_true")]
    pub insert: bool,

    #[serde(default = "default_true")]
    pub update: bool,

    #[serde(default)]
    pub delete: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_insert_pks: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_update_pks: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_delete_pks: Vec<String>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            insert: true,
            update: true,
            delete: false,
            selected_insert_pks: Vec::new(),
            selected_update_pks: Vec::new(),
            selected_delete_pks: Vec::new(),
        }
    }
}

impl TableOptions {
    /// True when every operation is switched off and the table should be skipped.
    pub fn is_disabled(&self) -> bool {
        !self.insert && !self.update && !self.delete
    }
}

/// A primary-key allow-list. Empty means "allow everything".
#[derive(Debug, Clone, Default)]
pub struct PkSelection(Option<HashSet<String>>);

impl PkSelection {
    pub fn from_list(pks: &[String]) -> Self {
        if pks.is_empty() {
            Self(None)
        } else {
            Self(Some(pks.iter().map(|pk| pk.trim().to_string()).collect()))
        }
    }

    pub fn allows(&self, pk: &str) -> bool {
        match &self.0 {
            None => true,
            Some(set) => set.contains(pk),
        }
    }

    pub fn is_all(&self) -> bool {
        self.0.is_none()
    }
}

fn default_true() -> bool {
    true
}
