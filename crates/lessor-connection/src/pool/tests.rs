//! Tests for the named connection pool

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lessor_core::{
    Connection, ConnectionConfig, DatabaseDriver, LessorError, MemoryStorage, PoolLimits, Result,
    StatementResult, Storage, put_json,
};
use lessor_drivers::DriverRegistry;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::{ConnectionPoolManager, PoolEntryState, force_utc};

/// Mock connection whose ping can be broken from the outside
struct MockConnection {
    closed: AtomicBool,
    healthy: Arc<AtomicBool>,
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn ping(&self) -> Result<()> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LessorError::ConnectionFailure("server went away".into()))
        }
    }

    async fn prepare(&self, _sql: &str) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, _sql: &str) -> Result<StatementResult> {
        Ok(StatementResult::new(1))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Mock driver that counts dials and records what it was asked to open
struct MockDriver {
    opened: AtomicUsize,
    healthy: Arc<AtomicBool>,
    last_open: Mutex<Option<(String, PoolLimits)>>,
    dial_delay: Duration,
}

impl MockDriver {
    fn new() -> Self {
        Self {
            opened: AtomicUsize::new(0),
            healthy: Arc::new(AtomicBool::new(true)),
            last_open: Mutex::new(None),
            dial_delay: Duration::ZERO,
        }
    }

    fn with_dial_delay(mut self, delay: Duration) -> Self {
        self.dial_delay = delay;
        self
    }

    fn count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

#[async_trait]
impl DatabaseDriver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["mock-database-plugin"]
    }

    fn session_timezone_param(&self) -> Option<(&'static str, &'static str)> {
        Some(("timezone", "utc"))
    }

    async fn open(&self, connection_string: &str, limits: PoolLimits) -> Result<Arc<dyn Connection>> {
        if !self.dial_delay.is_zero() {
            tokio::time::sleep(self.dial_delay).await;
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        *self.last_open.lock() = Some((connection_string.to_string(), limits));
        Ok(Arc::new(MockConnection {
            closed: AtomicBool::new(false),
            healthy: self.healthy.clone(),
        }))
    }
}

async fn setup(driver: MockDriver) -> (Arc<ConnectionPoolManager>, Arc<MockDriver>, Arc<MemoryStorage>) {
    let driver = Arc::new(driver);
    let mut registry = DriverRegistry::new();
    registry.register(driver.clone());

    let storage = Arc::new(MemoryStorage::new());
    let config = ConnectionConfig::new("main", "mock", "mock://admin@db/app")
        .with_max_open_connections(5)
        .with_max_idle_connections(3);
    put_json(storage.as_ref(), "dbs/main", &config).await.unwrap();

    let pools = Arc::new(ConnectionPoolManager::new(
        storage.clone() as Arc<dyn Storage>,
        Arc::new(registry),
    ));
    (pools, driver, storage)
}

// =============================================================================
// db_connection tests
// =============================================================================

#[tokio::test]
async fn test_unknown_name_is_not_configured() {
    let (pools, driver, _) = setup(MockDriver::new()).await;

    let err = pools.db_connection("missing").await.unwrap_err();
    assert!(matches!(err, LessorError::NotConfigured(name) if name == "missing"));
    assert_eq!(driver.count(), 0);
    assert_eq!(pools.state("missing").await, PoolEntryState::Unconfigured);
}

#[tokio::test]
async fn test_healthy_handle_is_reused() {
    let (pools, driver, _) = setup(MockDriver::new()).await;

    let first = pools.db_connection("main").await.unwrap();
    let second = pools.db_connection("main").await.unwrap();

    assert!(first.same_handle(&second));
    assert_eq!(driver.count(), 1);
    assert_eq!(first.name(), "main");
    assert_eq!(pools.state("main").await, PoolEntryState::Connected);
}

#[tokio::test]
async fn test_failed_ping_reconnects() {
    let (pools, driver, _) = setup(MockDriver::new()).await;

    let first = pools.db_connection("main").await.unwrap();
    driver.set_healthy(false);
    let second = pools.db_connection("main").await.unwrap();

    assert_eq!(driver.count(), 2);
    assert!(first.is_closed());
    assert!(!first.same_handle(&second));
}

#[tokio::test]
async fn test_opened_with_utc_and_limits() {
    let (pools, driver, _) = setup(MockDriver::new()).await;

    pools.db_connection("main").await.unwrap();

    let (connection_string, limits) = driver.last_open.lock().clone().unwrap();
    assert_eq!(connection_string, "mock://admin@db/app?timezone=utc");
    assert_eq!(
        limits,
        PoolLimits {
            max_open: Some(5),
            max_idle: 3
        }
    );
}

#[tokio::test]
async fn test_unknown_driver_is_invalid_configuration() {
    let (pools, driver, storage) = setup(MockDriver::new()).await;
    let config = ConnectionConfig::new("legacy", "oracle", "oracle://db");
    put_json(storage.as_ref(), "dbs/legacy", &config).await.unwrap();

    let err = pools.db_connection("legacy").await.unwrap_err();
    assert!(matches!(err, LessorError::InvalidConfiguration(_)));
    assert_eq!(driver.count(), 0);
}

#[tokio::test]
async fn test_config_snapshot_is_attached() {
    let (pools, _, _) = setup(MockDriver::new()).await;
    let conn = pools.db_connection("main").await.unwrap();
    assert_eq!(conn.config().database_type, "mock");
    assert_eq!(conn.config().max_open_connections, 5);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_dial() {
    let (pools, driver, _) =
        setup(MockDriver::new().with_dial_delay(Duration::from_millis(20))).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let pools = pools.clone();
        tasks.push(tokio::spawn(async move { pools.db_connection("main").await }));
    }
    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.unwrap().unwrap());
    }

    assert_eq!(driver.count(), 1);
    assert!(handles.windows(2).all(|w| w[0].same_handle(&w[1])));
}

// =============================================================================
// reset / close tests
// =============================================================================

#[tokio::test]
async fn test_reset_forces_redial() {
    let (pools, driver, _) = setup(MockDriver::new()).await;

    let first = pools.db_connection("main").await.unwrap();
    pools.reset_db("main").await.unwrap();
    assert!(first.is_closed());
    assert_eq!(pools.state("main").await, PoolEntryState::Unconfigured);

    pools.db_connection("main").await.unwrap();
    assert_eq!(driver.count(), 2);
}

#[tokio::test]
async fn test_close_then_reconnect_lazily() {
    let (pools, driver, _) = setup(MockDriver::new()).await;

    let first = pools.db_connection("main").await.unwrap();
    pools.close_db("main").await.unwrap();
    assert!(first.is_closed());
    assert_eq!(pools.state("main").await, PoolEntryState::Closed);
    assert_eq!(driver.count(), 1);

    let second = pools.db_connection("main").await.unwrap();
    assert!(!second.is_closed());
    assert_eq!(driver.count(), 2);
}

#[tokio::test]
async fn test_reset_unknown_name_is_noop() {
    let (pools, _, _) = setup(MockDriver::new()).await;
    pools.reset_db("nothing").await.unwrap();
    pools.close_db("nothing").await.unwrap();
    assert!(pools.names().is_empty());
}

#[tokio::test]
async fn test_close_all_and_forget() {
    let (pools, _, storage) = setup(MockDriver::new()).await;
    let config = ConnectionConfig::new("reporting", "mock-database-plugin", "mock://db/reporting");
    put_json(storage.as_ref(), "dbs/reporting", &config).await.unwrap();

    let main = pools.db_connection("main").await.unwrap();
    let reporting = pools.db_connection("reporting").await.unwrap();
    assert_eq!(pools.names(), vec!["main".to_string(), "reporting".to_string()]);

    pools.forget("reporting").await.unwrap();
    assert!(reporting.is_closed());
    assert_eq!(pools.names(), vec!["main".to_string()]);

    pools.close_all().await.unwrap();
    assert!(main.is_closed());
    assert!(pools.names().is_empty());
}

#[test]
fn test_force_utc_uses_driver_parameter() {
    let driver = MockDriver::new();
    assert_eq!(
        force_utc(&driver, "host=db user=app"),
        "host=db user=app timezone='utc'"
    );
    assert_eq!(force_utc(&driver, "mock://db?a=b"), "mock://db?a=b&timezone=utc");
}
