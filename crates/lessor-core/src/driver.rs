//! Database driver trait definition

use crate::{Connection, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Highest number of physical connections a handle keeps when the
/// configuration asks for an unlimited pool.
pub const UNLIMITED_POOL_SIZE: usize = 512;

/// Sizing of the driver-side pool behind a [`Connection`] handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    /// Maximum open connections, `None` for unlimited
    pub max_open: Option<usize>,
    /// Maximum idle connections kept around, `0` disables idle connections
    pub max_idle: usize,
}

impl PoolLimits {
    /// Upper bound to hand to pool implementations that need a finite size
    pub fn max_size(&self) -> usize {
        self.max_open.unwrap_or(UNLIMITED_POOL_SIZE)
    }
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            max_open: Some(2),
            max_idle: 2,
        }
    }
}

/// Core driver trait that all database drivers must implement
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier for this driver (e.g., "postgres", "mysql")
    fn name(&self) -> &'static str;

    /// Human-readable name (e.g., "PostgreSQL", "MySQL")
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// Alternative names accepted as `database_type`
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Connection string parameter that forces the session time zone to UTC.
    ///
    /// Returns `(key, value)`, or `None` when the driver pins the time zone
    /// some other way (for example an init statement).
    fn session_timezone_param(&self) -> Option<(&'static str, &'static str)> {
        None
    }

    /// Open a handle over the given connection string
    async fn open(&self, connection_string: &str, limits: PoolLimits)
    -> Result<Arc<dyn Connection>>;

    /// Open, ping and close a handle
    async fn test_connection(&self, connection_string: &str) -> Result<()> {
        let conn = self
            .open(
                connection_string,
                PoolLimits {
                    max_open: Some(1),
                    max_idle: 0,
                },
            )
            .await?;
        let ping = conn.ping().await;
        conn.close().await?;
        ping
    }
}
