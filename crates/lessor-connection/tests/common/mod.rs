//! Shared fakes for connection integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use lessor_connection::ConnectionPoolManager;
use lessor_core::{
    Connection, DatabaseDriver, LessorError, MemoryStorage, PoolLimits, Result, StatementResult,
    Storage,
};
use lessor_drivers::DriverRegistry;

/// Connection strings containing this marker refuse to connect
pub const UNREACHABLE: &str = "unreachable";

pub struct FakeConnection {
    closed: AtomicBool,
    reachable: bool,
}

#[async_trait]
impl Connection for FakeConnection {
    fn driver_name(&self) -> &str {
        "fake"
    }

    async fn ping(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(LessorError::ConnectionFailure("connection refused".into()))
        }
    }

    async fn prepare(&self, _sql: &str) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, _sql: &str) -> Result<StatementResult> {
        Ok(StatementResult::default())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Driver that counts every open, including verification dials
#[derive(Default)]
pub struct FakeDriver {
    pub opened: AtomicUsize,
}

impl FakeDriver {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseDriver for FakeDriver {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn open(&self, connection_string: &str, _limits: PoolLimits) -> Result<Arc<dyn Connection>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeConnection {
            closed: AtomicBool::new(false),
            reachable: !connection_string.contains(UNREACHABLE),
        }))
    }
}

pub struct Harness {
    pub storage: Arc<MemoryStorage>,
    pub driver: Arc<FakeDriver>,
    pub pools: Arc<ConnectionPoolManager>,
}

/// Initialize logging for tests if not already initialized
pub fn initialize_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("lessor_connection=debug".parse().unwrap()),
            )
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

pub fn harness() -> Harness {
    initialize_logging();
    let storage = Arc::new(MemoryStorage::new());
    let driver = Arc::new(FakeDriver::default());
    let mut registry = DriverRegistry::new();
    registry.register(driver.clone());
    let pools = Arc::new(ConnectionPoolManager::new(
        storage.clone() as Arc<dyn Storage>,
        Arc::new(registry),
    ));
    Harness {
        storage,
        driver,
        pools,
    }
}
