//! PostgreSQL connection implementation

use std::cell::Cell;
use std::time::Duration;

use async_trait::async_trait;
use deadpool::Runtime;
use deadpool::managed::{self, Metrics, Object, Pool, PoolError, RecycleError, RecycleResult};
use lessor_core::{Connection, LessorError, PoolLimits, Result, StatementResult};
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::Client;
use tokio_postgres::error::SqlState;

const WAIT_TIMEOUT: Duration = Duration::from_secs(30);
const CREATE_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut message = db_error.message().to_string();
    if let Some(detail) = db_error.detail()
        && !detail.trim().is_empty()
    {
        message.push_str(&format!(" (detail: {})", detail));
    }
    if let Some(hint) = db_error.hint()
        && !hint.trim().is_empty()
    {
        message.push_str(&format!(" (hint: {})", hint));
    }

    format!("{} (code: {})", message, db_error.code().code())
}

/// Classify a tokio-postgres error into the Lessor taxonomy
pub(crate) fn map_postgres_error(error: &tokio_postgres::Error) -> LessorError {
    match error.code() {
        Some(code) if *code == SqlState::UNDEFINED_OBJECT => {
            LessorError::ObjectMissing(format_postgres_error(error))
        }
        Some(_) => LessorError::Query(format_postgres_error(error)),
        None => LessorError::ConnectionFailure(format_postgres_error(error)),
    }
}

fn map_pool_error(error: PoolError<tokio_postgres::Error>) -> LessorError {
    match error {
        PoolError::Backend(e) => match map_postgres_error(&e) {
            LessorError::Query(message) => LessorError::ConnectionFailure(message),
            other => other,
        },
        PoolError::Closed => LessorError::ConnectionFailure("connection pool is closed".into()),
        other => LessorError::ConnectionFailure(other.to_string()),
    }
}

/// Creates and health-checks physical PostgreSQL sessions
pub(crate) struct PostgresManager {
    config: tokio_postgres::Config,
    tls: MakeTlsConnector,
}

impl PostgresManager {
    pub(crate) fn new(config: tokio_postgres::Config, tls: MakeTlsConnector) -> Self {
        Self { config, tls }
    }
}

impl managed::Manager for PostgresManager {
    type Type = Client;
    type Error = tokio_postgres::Error;

    async fn create(&self) -> std::result::Result<Client, tokio_postgres::Error> {
        let (client, connection) = self.config.connect(self.tls.clone()).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(error = %e, "PostgreSQL session ended with error");
            }
        });
        Ok(client)
    }

    async fn recycle(
        &self,
        client: &mut Client,
        _: &Metrics,
    ) -> RecycleResult<tokio_postgres::Error> {
        if client.is_closed() {
            return Err(RecycleError::Message("session closed by server".into()));
        }
        client
            .simple_query("")
            .await
            .map(|_| ())
            .map_err(RecycleError::Backend)
    }
}

/// A pooled handle to one PostgreSQL database
pub struct PostgresConnection {
    pool: Pool<PostgresManager>,
    limits: PoolLimits,
}

impl PostgresConnection {
    pub(crate) fn new(manager: PostgresManager, limits: PoolLimits) -> Result<Self> {
        let pool = Pool::builder(manager)
            .max_size(limits.max_size())
            .wait_timeout(Some(WAIT_TIMEOUT))
            .create_timeout(Some(CREATE_TIMEOUT))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| LessorError::Driver(format!("failed to build PostgreSQL pool: {e}")))?;
        Ok(Self { pool, limits })
    }

    async fn client(&self) -> Result<Object<PostgresManager>> {
        self.pool.get().await.map_err(map_pool_error)
    }

    /// Drop idle sessions above the configured idle limit
    fn trim_idle(&self) {
        let available = self.pool.status().available;
        if available <= self.limits.max_idle {
            return;
        }
        let excess = available - self.limits.max_idle;
        let dropped = Cell::new(0usize);
        self.pool.retain(|_, _| {
            if dropped.get() < excess {
                dropped.set(dropped.get() + 1);
                false
            } else {
                true
            }
        });
        tracing::trace!(dropped = dropped.get(), "trimmed idle PostgreSQL sessions");
    }
}

#[async_trait]
impl Connection for PostgresConnection {
    fn driver_name(&self) -> &str {
        "postgres"
    }

    async fn ping(&self) -> Result<()> {
        let result = {
            let client = self.client().await?;
            client
                .simple_query("SELECT 1")
                .await
                .map(|_| ())
                .map_err(|e| LessorError::ConnectionFailure(format_postgres_error(&e)))
        };
        self.trim_idle();
        result
    }

    #[tracing::instrument(skip(self, sql))]
    async fn prepare(&self, sql: &str) -> Result<()> {
        let result = {
            let client = self.client().await?;
            client
                .prepare(sql)
                .await
                .map(|_| ())
                .map_err(|e| map_postgres_error(&e))
        };
        self.trim_idle();
        result
    }

    #[tracing::instrument(skip(self, sql))]
    async fn execute(&self, sql: &str) -> Result<StatementResult> {
        let result = {
            let client = self.client().await?;
            client
                .execute(sql, &[])
                .await
                .map(StatementResult::new)
                .map_err(|e| map_postgres_error(&e))
        };
        self.trim_idle();
        if let Ok(ref statement) = result {
            tracing::debug!(affected_rows = statement.affected_rows, "statement executed");
        }
        result
    }

    async fn close(&self) -> Result<()> {
        tracing::debug!("closing PostgreSQL pool");
        self.pool.close();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}
