//! Per-name connection pool manager

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use lessor_core::{
    ConnectionConfig, DatabaseDriver, LessorError, Result, Storage, connection_key,
    connection_string, get_json,
};
use lessor_drivers::DriverRegistry;
use parking_lot::Mutex;

use super::pooled::PooledConnection;
use crate::health::{DEFAULT_PING_TIMEOUT, ping_connection};

/// Observable lifecycle state of one named entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolEntryState {
    /// No handle has been opened (or it was reset)
    Unconfigured,
    /// A handle is live
    Connected,
    /// The handle was closed explicitly; the next request reconnects
    Closed,
}

enum Slot {
    Empty,
    Connected(PooledConnection),
    Closed,
}

type SlotRef = Arc<tokio::sync::Mutex<Slot>>;

/// Rewrite a connection string so sessions run in UTC
pub fn force_utc(driver: &dyn DatabaseDriver, raw: &str) -> String {
    match driver.session_timezone_param() {
        Some((key, value)) => connection_string::append_param(raw, key, value),
        None => raw.to_string(),
    }
}

/// Manages one live handle per configured database name
///
/// A short lock guards the name to slot map. Each slot carries its own
/// async mutex that is held across ping and dial, so callers for the same
/// name serialise while distinct names proceed concurrently.
pub struct ConnectionPoolManager {
    storage: Arc<dyn Storage>,
    drivers: Arc<DriverRegistry>,
    slots: Mutex<HashMap<String, SlotRef>>,
    ping_timeout: Duration,
}

impl ConnectionPoolManager {
    pub fn new(storage: Arc<dyn Storage>, drivers: Arc<DriverRegistry>) -> Self {
        Self {
            storage,
            drivers,
            slots: Mutex::new(HashMap::new()),
            ping_timeout: DEFAULT_PING_TIMEOUT,
        }
    }

    /// Set the upper bound on the health check of a reused handle
    pub fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn drivers(&self) -> &Arc<DriverRegistry> {
        &self.drivers
    }

    fn slot(&self, name: &str) -> SlotRef {
        self.slots
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(Slot::Empty)))
            .clone()
    }

    fn existing_slot(&self, name: &str) -> Option<SlotRef> {
        self.slots.lock().get(name).cloned()
    }

    /// Get a live handle for `name`, dialing from the stored configuration
    /// when there is none or the current one fails its ping.
    #[tracing::instrument(skip(self), fields(database = %name))]
    pub async fn db_connection(&self, name: &str) -> Result<PooledConnection> {
        let slot = self.slot(name);
        let mut guard = slot.lock().await;

        if let Slot::Connected(existing) = &*guard {
            match ping_connection(existing.handle().as_ref(), self.ping_timeout).await {
                Ok(latency) => {
                    tracing::trace!(?latency, "reusing pooled connection");
                    return Ok(existing.clone());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "pooled connection failed health check, reconnecting");
                    if let Err(close_err) = existing.close().await {
                        tracing::debug!(error = %close_err, "error closing stale connection");
                    }
                    *guard = Slot::Empty;
                }
            }
        }

        let config: ConnectionConfig = get_json(self.storage.as_ref(), &connection_key(name))
            .await?
            .ok_or_else(|| LessorError::NotConfigured(name.to_string()))?;
        let driver = self.drivers.resolve(&config.database_type)?;

        let connection_string = force_utc(driver.as_ref(), &config.connection_string);
        let limits = config.pool_limits();
        let handle = driver.open(&connection_string, limits).await?;

        tracing::info!(
            driver = driver.name(),
            max_open = ?limits.max_open,
            max_idle = limits.max_idle,
            "opened database connection"
        );

        let pooled = PooledConnection::new(name, handle, config);
        *guard = Slot::Connected(pooled.clone());
        Ok(pooled)
    }

    /// Close and discard the handle for `name` so the next request re-dials
    #[tracing::instrument(skip(self), fields(database = %name))]
    pub async fn reset_db(&self, name: &str) -> Result<()> {
        let Some(slot) = self.existing_slot(name) else {
            return Ok(());
        };
        let mut guard = slot.lock().await;
        let result = close_slot(&mut guard).await;
        *guard = Slot::Empty;
        tracing::debug!("connection reset");
        result
    }

    /// Close the handle for `name`; the next request reconnects lazily
    #[tracing::instrument(skip(self), fields(database = %name))]
    pub async fn close_db(&self, name: &str) -> Result<()> {
        let Some(slot) = self.existing_slot(name) else {
            return Ok(());
        };
        let mut guard = slot.lock().await;
        let result = close_slot(&mut guard).await;
        *guard = Slot::Closed;
        tracing::debug!("connection closed");
        result
    }

    /// Close the handle for `name` and drop its entry entirely
    pub async fn forget(&self, name: &str) -> Result<()> {
        let result = self.reset_db(name).await;
        self.slots.lock().remove(name);
        result
    }

    /// Close every handle, used on shutdown
    #[tracing::instrument(skip(self))]
    pub async fn close_all(&self) -> Result<()> {
        let slots: Vec<(String, SlotRef)> = self.slots.lock().drain().collect();
        tracing::info!(count = slots.len(), "closing all database connections");

        let mut first_error = None;
        for (name, slot) in slots {
            let mut guard = slot.lock().await;
            if let Err(e) = close_slot(&mut guard).await {
                tracing::warn!(database = %name, error = %e, "error closing connection");
                first_error.get_or_insert(e);
            }
            *guard = Slot::Closed;
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Current lifecycle state for `name`.
    ///
    /// Waits for any in-flight dial on that name to finish.
    pub async fn state(&self, name: &str) -> PoolEntryState {
        let Some(slot) = self.existing_slot(name) else {
            return PoolEntryState::Unconfigured;
        };
        let guard = slot.lock().await;
        match &*guard {
            Slot::Empty => PoolEntryState::Unconfigured,
            Slot::Connected(_) => PoolEntryState::Connected,
            Slot::Closed => PoolEntryState::Closed,
        }
    }

    /// Names that currently have an entry
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

async fn close_slot(slot: &mut Slot) -> Result<()> {
    match std::mem::replace(slot, Slot::Empty) {
        Slot::Connected(pooled) => pooled.close().await,
        Slot::Empty | Slot::Closed => Ok(()),
    }
}
