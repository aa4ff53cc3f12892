//! Driver registry for managing available database drivers

use std::collections::HashMap;
use std::sync::Arc;

use lessor_core::{DatabaseDriver, LessorError, Result};

/// Registry of available database drivers
///
/// Lookups are case-insensitive and accept any alias a driver declares.
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn DatabaseDriver>>,
    aliases: HashMap<String, String>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Create a registry with all built-in drivers registered
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "postgres")]
        registry.register(Arc::new(crate::postgres::PostgresDriver::new()));
        #[cfg(feature = "mysql")]
        registry.register(Arc::new(crate::mysql::MySqlDriver::new()));

        registry
    }

    /// Register a new driver
    pub fn register(&mut self, driver: Arc<dyn DatabaseDriver>) {
        let name = driver.name().to_lowercase();
        tracing::info!(driver = %name, "registering database driver");
        for alias in driver.aliases() {
            self.aliases.insert(alias.to_lowercase(), name.clone());
        }
        self.drivers.insert(name, driver);
    }

    /// Get a driver by name or alias
    pub fn get(&self, name: &str) -> Option<Arc<dyn DatabaseDriver>> {
        let key = name.trim().to_lowercase();
        let canonical = self.aliases.get(&key).unwrap_or(&key);
        let driver = self.drivers.get(canonical).cloned();
        if driver.is_none() {
            tracing::warn!(driver = %name, "driver not found in registry");
        }
        driver
    }

    /// Get a driver, failing with a configuration error when it is unknown
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn DatabaseDriver>> {
        self.get(name).ok_or_else(|| {
            let mut known = self.list();
            known.sort_unstable();
            LessorError::InvalidConfiguration(format!(
                "unsupported database_type {:?}, expected one of: {}",
                name,
                known.join(", ")
            ))
        })
    }

    /// List all registered driver names
    pub fn list(&self) -> Vec<&str> {
        self.drivers.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a driver is registered under this name or alias
    pub fn has(&self, name: &str) -> bool {
        let key = name.trim().to_lowercase();
        self.drivers.contains_key(&key) || self.aliases.contains_key(&key)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
