//! In-memory database engine shared by the integration tests.
//!
//! A [`MemoryDriver`] serves any number of named databases; the test keeps a
//! [`MemoryDb`] handle to seed tables before a job and inspect them after.
//! The connection understands just the statements the engine issues:
//! `SELECT * FROM`, `TRUNCATE TABLE`, `DELETE FROM`, `ALTER TABLE .. ADD COLUMN`
//! and `CREATE TABLE`.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, Once};

use async_trait::async_trait;
use table_sync::core::row;
use table_sync::{
    BatchApplier, ChangeSet, ColumnDefinition, ConnectionConfig, Database, Driver, QueryResult,
    Result, Row, SqlValue, SyncError,
};

static INIT: Once = Once::new();

/// Route engine tracing to the test output (`RUST_LOG=table_sync=debug`).
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone, Default)]
struct MemTable {
    columns: Vec<ColumnDefinition>,
    rows: Vec<Row>,
    create_sql: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: BTreeMap<String, MemTable>,
    executed: Vec<String>,
    queries: Vec<String>,
    applied: Vec<(String, ChangeSet)>,
    fail_apply: HashSet<String>,
    fail_exec_prefix: Option<String>,
    fail_columns: HashSet<String>,
    closed: usize,
}

/// Shared handle to one in-memory database.
#[derive(Debug, Clone, Default)]
pub struct MemoryDb(Arc<Mutex<MemoryState>>);

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.0.lock().unwrap()
    }

    /// Create (or replace) a table.
    pub fn create_table(&self, name: &str, columns: Vec<ColumnDefinition>, rows: Vec<Row>) -> &Self {
        let create_sql = create_statement(name, &columns);
        self.state().tables.insert(
            name.to_lowercase(),
            MemTable {
                columns,
                rows,
                create_sql,
            },
        );
        self
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.state().tables.contains_key(&name.to_lowercase())
    }

    pub fn rows(&self, name: &str) -> Vec<Row> {
        self.state()
            .tables
            .get(&name.to_lowercase())
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Rows sorted by the printed value of `pk`.
    pub fn sorted_rows(&self, name: &str, pk: &str) -> Vec<Row> {
        let mut rows = self.rows(name);
        rows.sort_by_key(|r| r.get(pk).map(|v| v.to_string()).unwrap_or_default());
        rows
    }

    pub fn column_names(&self, name: &str) -> Vec<String> {
        self.state()
            .tables
            .get(&name.to_lowercase())
            .map(|t| t.columns.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn column(&self, table: &str, column: &str) -> Option<ColumnDefinition> {
        self.state()
            .tables
            .get(&table.to_lowercase())
            .and_then(|t| t.columns.iter().find(|c| c.name == column).cloned())
    }

    pub fn executed(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.state().queries.clone()
    }

    pub fn applied(&self) -> Vec<(String, ChangeSet)> {
        self.state().applied.clone()
    }

    pub fn closed(&self) -> usize {
        self.state().closed
    }

    /// Make `apply_changes` fail for `table`.
    pub fn fail_apply(&self, table: &str) {
        self.state().fail_apply.insert(table.to_lowercase());
    }

    /// Make every `exec` whose SQL starts with `prefix` fail.
    pub fn fail_exec(&self, prefix: &str) {
        self.state().fail_exec_prefix = Some(prefix.to_uppercase());
    }

    /// Make `get_columns` fail for `table`.
    pub fn fail_columns(&self, table: &str) {
        self.state().fail_columns.insert(table.to_lowercase());
    }
}

/// Serves [`MemoryDb`]s by database name.
pub struct MemoryDriver {
    name: String,
    databases: HashMap<String, MemoryDb>,
    batch_writes: bool,
}

impl MemoryDriver {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            databases: HashMap::new(),
            batch_writes: true,
        }
    }

    pub fn with_database(mut self, database: &str, db: &MemoryDb) -> Self {
        self.databases.insert(database.to_string(), db.clone());
        self
    }

    /// Connections do not expose a batch writer.
    pub fn without_batch_writes(mut self) -> Self {
        self.batch_writes = false;
        self
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Database>> {
        let db = self
            .databases
            .get(&config.database)
            .ok_or_else(|| SyncError::Config(format!("unknown database '{}'", config.database)))?;
        Ok(Box::new(MemoryConnection {
            db_type: self.name.clone(),
            db: db.clone(),
            batch_writes: self.batch_writes,
        }))
    }
}

struct MemoryConnection {
    db_type: String,
    db: MemoryDb,
    batch_writes: bool,
}

#[async_trait]
impl Database for MemoryConnection {
    fn db_type(&self) -> &str {
        &self.db_type
    }

    async fn close(&mut self) -> Result<()> {
        self.db.state().closed += 1;
        Ok(())
    }

    async fn get_columns(&self, _schema: &str, table: &str) -> Result<Vec<ColumnDefinition>> {
        let state = self.db.state();
        let key = table.to_lowercase();
        if state.fail_columns.contains(&key) {
            return Err(SyncError::Query(format!("introspection of {} failed", table)));
        }
        Ok(state
            .tables
            .get(&key)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn get_create_statement(&self, _schema: &str, table: &str) -> Result<String> {
        self.db
            .state()
            .tables
            .get(&table.to_lowercase())
            .map(|t| t.create_sql.clone())
            .ok_or_else(|| SyncError::Query(format!("table {} doesn't exist", table)))
    }

    async fn query(&self, sql: &str) -> Result<QueryResult> {
        let name = strip_prefix_ci(sql, "SELECT * FROM ")
            .map(table_name)
            .ok_or_else(|| SyncError::Query(format!("unsupported query: {}", sql)))?;
        let mut state = self.db.state();
        state.queries.push(sql.to_string());
        let table = state
            .tables
            .get(&name)
            .ok_or_else(|| SyncError::Query(format!("table {} doesn't exist", name)))?;
        Ok(QueryResult::new(
            table.columns.iter().map(|c| c.name.clone()).collect(),
            table.rows.clone(),
        ))
    }

    async fn exec(&self, sql: &str) -> Result<u64> {
        let mut state = self.db.state();
        state.executed.push(sql.to_string());
        if let Some(prefix) = &state.fail_exec_prefix {
            if sql.to_uppercase().starts_with(prefix.as_str()) {
                return Err(SyncError::Exec(format!("rejected: {}", sql)));
            }
        }

        if let Some(rest) = strip_prefix_ci(sql, "TRUNCATE TABLE ")
            .or_else(|| strip_prefix_ci(sql, "DELETE FROM "))
        {
            let table = state
                .tables
                .get_mut(&table_name(rest))
                .ok_or_else(|| SyncError::Exec(format!("no such table: {}", rest)))?;
            let removed = table.rows.len() as u64;
            table.rows.clear();
            return Ok(removed);
        }

        if let Some(rest) = strip_prefix_ci(sql, "ALTER TABLE ") {
            let (name, column) = rest
                .split_once(" ADD COLUMN ")
                .ok_or_else(|| SyncError::Exec(format!("unsupported ALTER: {}", sql)))?;
            let mut parts = column.split_whitespace();
            let col_name = parts.next().map(unquote).unwrap_or_default();
            let data_type = parts.next().unwrap_or_default().to_string();
            let table = state
                .tables
                .get_mut(&table_name(name))
                .ok_or_else(|| SyncError::Exec(format!("no such table: {}", name)))?;
            table.columns.push(ColumnDefinition::new(col_name, data_type));
            return Ok(0);
        }

        if let Some(rest) = strip_prefix_ci(sql, "CREATE TABLE ") {
            let (name, body) = rest
                .split_once('(')
                .ok_or_else(|| SyncError::Exec(format!("unsupported CREATE: {}", sql)))?;
            let body = body.trim_end().trim_end_matches(';');
            let body = body.strip_suffix(')').unwrap_or(body);
            let columns = body
                .split(',')
                .filter_map(|def| {
                    let mut parts = def.split_whitespace();
                    let name = unquote(parts.next()?);
                    let data_type = parts.next().unwrap_or("TEXT");
                    let col = ColumnDefinition::new(name, data_type);
                    Some(if def.to_uppercase().contains("PRIMARY KEY") {
                        col.primary()
                    } else {
                        col
                    })
                })
                .collect();
            let name = table_name(name);
            let create_sql = sql.to_string();
            state.tables.insert(
                name,
                MemTable {
                    columns,
                    rows: Vec::new(),
                    create_sql,
                },
            );
            return Ok(0);
        }

        Err(SyncError::Exec(format!("unsupported statement: {}", sql)))
    }

    fn batch_applier(&self) -> Option<&dyn BatchApplier> {
        if self.batch_writes {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl BatchApplier for MemoryConnection {
    async fn apply_changes(&self, table: &str, changes: &ChangeSet) -> Result<()> {
        let mut state = self.db.state();
        let name = table_name(table);
        state.applied.push((table.to_string(), changes.clone()));
        if state.fail_apply.contains(&name) {
            return Err(SyncError::Exec(format!("deadlock while writing {}", name)));
        }

        let target = state
            .tables
            .get_mut(&name)
            .ok_or_else(|| SyncError::Exec(format!("no such table: {}", name)))?;

        // Work on a copy so a failure leaves the table untouched.
        let mut rows = target.rows.clone();
        for insert in &changes.inserts {
            rows.push(insert.clone());
        }
        for update in &changes.updates {
            let row = rows
                .iter_mut()
                .find(|r| matches_keys(r, &update.keys))
                .ok_or_else(|| SyncError::Exec(format!("update matched no row in {}", name)))?;
            for (column, value) in &update.values {
                row.insert(column.clone(), value.clone());
            }
        }
        for keys in &changes.deletes {
            rows.retain(|r| !matches_keys(r, keys));
        }
        target.rows = rows;
        Ok(())
    }
}

fn matches_keys(row: &Row, keys: &Row) -> bool {
    !keys.is_empty()
        && keys
            .iter()
            .all(|(k, v)| row.get(k).map(|rv| rv.to_string()) == Some(v.to_string()))
}

fn strip_prefix_ci<'a>(sql: &'a str, prefix: &str) -> Option<&'a str> {
    let head = sql.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &sql[prefix.len()..])
}

fn unquote(ident: &str) -> String {
    ident
        .trim_matches(|c| matches!(c, '`' | '"' | '[' | ']'))
        .to_string()
}

/// Lowercased bare table name of a possibly qualified, quoted reference.
fn table_name(reference: &str) -> String {
    let reference = reference.trim();
    let last = reference.rsplit('.').next().unwrap_or(reference);
    unquote(last.trim()).to_lowercase()
}

fn create_statement(name: &str, columns: &[ColumnDefinition]) -> String {
    let defs: Vec<String> = columns
        .iter()
        .map(|c| {
            let mut def = format!("`{}` {}", c.name, c.data_type);
            if c.primary_key {
                def.push_str(" PRIMARY KEY");
            }
            def
        })
        .collect();
    format!("CREATE TABLE `{}` ({})", name, defs.join(", "))
}

// =============================================================================
// Fixtures
// =============================================================================

/// `users (id INT PRIMARY KEY, name VARCHAR(64))`.
pub fn users_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("id", "int").primary(),
        ColumnDefinition::new("name", "varchar(64)"),
    ]
}

pub fn user(id: i64, name: &str) -> Row {
    row([("id", SqlValue::Int(id)), ("name", SqlValue::text(name))])
}
