//! PostgreSQL driver implementation

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use lessor_core::{Connection, DatabaseDriver, LessorError, PoolLimits, Result};

use crate::PostgresConnection;
use crate::connection::PostgresManager;
use crate::tls::build_tls_connector;

/// PostgreSQL database driver
pub struct PostgresDriver;

impl PostgresDriver {
    /// Create a new PostgreSQL driver instance
    pub fn new() -> Self {
        tracing::debug!("PostgreSQL driver initialized");
        Self
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn display_name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["postgresql", "postgresql-database-plugin"]
    }

    fn session_timezone_param(&self) -> Option<(&'static str, &'static str)> {
        Some(("options", "-c TimeZone=UTC"))
    }

    #[tracing::instrument(skip(self, connection_string), fields(max_open = ?limits.max_open, max_idle = limits.max_idle))]
    async fn open(
        &self,
        connection_string: &str,
        limits: PoolLimits,
    ) -> Result<Arc<dyn Connection>> {
        let config = tokio_postgres::Config::from_str(connection_string).map_err(|e| {
            LessorError::InvalidConfiguration(format!("invalid PostgreSQL connection string: {e}"))
        })?;
        let tls = build_tls_connector(config.get_ssl_mode())?;

        let connection = PostgresConnection::new(PostgresManager::new(config, tls), limits)?;
        tracing::info!("PostgreSQL pool opened");
        Ok(Arc::new(connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_driver_identity() {
        let driver = PostgresDriver::new();
        assert_eq!(driver.name(), "postgres");
        assert!(driver.aliases().contains(&"postgresql"));
        assert_eq!(
            driver.session_timezone_param(),
            Some(("options", "-c TimeZone=UTC"))
        );
    }

    #[tokio::test]
    async fn test_open_rejects_malformed_string() {
        let driver = PostgresDriver::new();
        let result = driver
            .open("host=localhost port=notaport", PoolLimits::default())
            .await;
        assert!(matches!(result, Err(LessorError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_open_is_lazy() {
        let driver = PostgresDriver::new();
        let conn = driver
            .open(
                "postgres://nobody@127.0.0.1:1/none?connect_timeout=1",
                PoolLimits::default(),
            )
            .await
            .unwrap();
        assert!(!conn.is_closed());
        conn.close().await.unwrap();
        assert!(conn.is_closed());
    }
}
