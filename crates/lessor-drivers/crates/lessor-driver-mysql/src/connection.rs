//! MySQL connection implementation

use async_trait::async_trait;
use lessor_core::{Connection, LessorError, Result, StatementResult};
use mysql_async::prelude::*;
use mysql_async::{Conn, Pool};
use parking_lot::Mutex;

/// Server error raised when dropping or altering a user that does not exist
/// (`ER_CANNOT_USER`).
const ER_CANNOT_USER: u16 = 1396;

/// Classify a mysql_async error into the Lessor taxonomy
pub(crate) fn map_mysql_error(error: mysql_async::Error) -> LessorError {
    match error {
        mysql_async::Error::Server(server) if server.code == ER_CANNOT_USER => {
            LessorError::ObjectMissing(format!("{} (code: {})", server.message, server.code))
        }
        mysql_async::Error::Server(server) => {
            LessorError::Query(format!("{} (code: {})", server.message, server.code))
        }
        other @ (mysql_async::Error::Io(_) | mysql_async::Error::Driver(_)) => {
            LessorError::ConnectionFailure(other.to_string())
        }
        other => LessorError::Driver(other.to_string()),
    }
}

/// A pooled handle to one MySQL database
pub struct MySqlConnection {
    pool: Mutex<Option<Pool>>,
}

impl MySqlConnection {
    pub(crate) fn new(pool: Pool) -> Self {
        Self {
            pool: Mutex::new(Some(pool)),
        }
    }

    async fn get_conn(&self) -> Result<Conn> {
        let pool = self
            .pool
            .lock()
            .clone()
            .ok_or_else(|| LessorError::ConnectionFailure("connection pool is closed".into()))?;
        pool.get_conn().await.map_err(|e| match map_mysql_error(e) {
            LessorError::Query(message) => LessorError::ConnectionFailure(message),
            other => other,
        })
    }
}

#[async_trait]
impl Connection for MySqlConnection {
    fn driver_name(&self) -> &str {
        "mysql"
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.get_conn().await?;
        conn.ping()
            .await
            .map_err(|e| LessorError::ConnectionFailure(e.to_string()))
    }

    #[tracing::instrument(skip(self, sql))]
    async fn prepare(&self, sql: &str) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let statement = conn.prep(sql).await.map_err(map_mysql_error)?;
        conn.close(statement).await.map_err(map_mysql_error)
    }

    #[tracing::instrument(skip(self, sql))]
    async fn execute(&self, sql: &str) -> Result<StatementResult> {
        let mut conn = self.get_conn().await?;
        conn.query_drop(sql).await.map_err(map_mysql_error)?;
        let affected_rows = conn.affected_rows();
        tracing::debug!(affected_rows = affected_rows, "statement executed");
        Ok(StatementResult::new(affected_rows))
    }

    async fn close(&self) -> Result<()> {
        let pool = self.pool.lock().take();
        if let Some(pool) = pool {
            tracing::info!("closing MySQL connection pool");
            pool.disconnect().await.map_err(|e| {
                LessorError::ConnectionFailure(format!("Failed to close MySQL connection: {}", e))
            })?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.pool.lock().is_none()
    }
}
