//! Handle handed out by the pool manager

use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lessor_core::{Connection, ConnectionConfig};

/// A live handle together with the configuration it was opened from
///
/// Cloning is cheap and shares the underlying handle. Dereferences to the
/// [`Connection`] for convenient use.
#[derive(Clone)]
pub struct PooledConnection {
    name: Arc<str>,
    handle: Arc<dyn Connection>,
    config: Arc<ConnectionConfig>,
    opened_at: Instant,
}

impl PooledConnection {
    pub(crate) fn new(name: &str, handle: Arc<dyn Connection>, config: ConnectionConfig) -> Self {
        Self {
            name: Arc::from(name),
            handle,
            config: Arc::new(config),
            opened_at: Instant::now(),
        }
    }

    /// Name of the database this handle belongs to
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> &Arc<dyn Connection> {
        &self.handle
    }

    /// Configuration snapshot taken when the handle was opened
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn opened_at(&self) -> Instant {
        self.opened_at
    }

    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// Returns true if both values share the same underlying handle
    pub fn same_handle(&self, other: &PooledConnection) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
    }
}

impl Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.handle.as_ref()
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("name", &self.name)
            .field("driver", &self.handle.driver_name())
            .field("closed", &self.handle.is_closed())
            .field("age", &self.age())
            .finish()
    }
}
