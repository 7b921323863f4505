//! Driver catalog for explicit dependency injection.
//!
//! The [`DriverCatalog`] maps database type names to [`Driver`]s. It is
//! built by the host and handed to the [`SyncEngine`](crate::SyncEngine);
//! there is no global registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::ConnectionConfig;
use crate::error::{Result, Side, SyncError};

use super::traits::{Database, Driver};

/// Registry of drivers by lower-cased database type.
#[derive(Default, Clone)]
pub struct DriverCatalog {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under its own name.
    pub fn register(&mut self, driver: Arc<dyn Driver>) -> &mut Self {
        let name = driver.name().to_lowercase();
        self.drivers.insert(name, driver);
        self
    }

    /// Register an existing driver under an additional type name.
    pub fn register_alias(&mut self, alias: &str, driver: Arc<dyn Driver>) -> &mut Self {
        self.drivers.insert(alias.to_lowercase(), driver);
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_driver(mut self, driver: Arc<dyn Driver>) -> Self {
        self.register(driver);
        self
    }

    /// Look up the driver for a database type.
    pub fn get(&self, db_type: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.get(&db_type.trim().to_lowercase()).cloned()
    }

    /// Look up a driver, failing when none is registered.
    pub fn require(&self, db_type: &str) -> Result<Arc<dyn Driver>> {
        self.get(db_type)
            .ok_or_else(|| SyncError::UnknownDriver(db_type.to_string()))
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.drivers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve the driver for `config` and open a connection.
    ///
    /// Connect failures are reported as [`SyncError::Connection`] for `side`.
    pub async fn open(&self, side: Side, config: &ConnectionConfig) -> Result<Box<dyn Database>> {
        let driver = self.require(&config.db_type())?;
        debug!("Opening {} connection via driver '{}'", side, driver.name());
        driver.connect(config).await.map_err(|e| match e {
            SyncError::Connection { .. } => e,
            other => SyncError::connection(side, other.to_string()),
        })
    }
}

impl std::fmt::Debug for DriverCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverCatalog")
            .field("drivers", &self.names())
            .finish()
    }
}
