//! Connection configuration lifecycle

use std::sync::Arc;

use lessor_core::{
    CONNECTION_PREFIX, ConnectionConfig, LessorError, Result, connection_key, get_json, put_json,
};
use serde::Serialize;

use crate::pool::{ConnectionPoolManager, force_utc};

const SECRET_WARNING: &str =
    "Read access to this endpoint should be controlled via ACLs as it will return the connection string as it is, including passwords, if any.";

/// A stored configuration returned together with operator warnings
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReadResponse {
    pub config: ConnectionConfig,
    pub warnings: Vec<String>,
}

/// Writes, reads, lists and deletes connection configurations, keeping the
/// pool in step with what is stored.
pub struct ConnectionService {
    pools: Arc<ConnectionPoolManager>,
}

impl ConnectionService {
    pub fn new(pools: Arc<ConnectionPoolManager>) -> Self {
        Self { pools }
    }

    pub fn pools(&self) -> &Arc<ConnectionPoolManager> {
        &self.pools
    }

    /// Validate, optionally verify, and persist a connection configuration.
    ///
    /// Any live handle for the name is reset so the next request dials with
    /// the new settings.
    #[tracing::instrument(skip(self, config), fields(database = %config.name, database_type = %config.database_type))]
    pub async fn write_connection(&self, config: ConnectionConfig) -> Result<()> {
        if config.name.trim().is_empty() {
            return Err(LessorError::InvalidConfiguration("name is required".into()));
        }
        if config.database_type.trim().is_empty() {
            return Err(LessorError::InvalidConfiguration(
                "database_type is required".into(),
            ));
        }
        if config.connection_string.trim().is_empty() {
            return Err(LessorError::InvalidConfiguration(
                "connection_string is required".into(),
            ));
        }

        let driver = self.pools.drivers().resolve(&config.database_type)?;
        let config = config.normalized();

        if config.verify_connection {
            let connection_string = force_utc(driver.as_ref(), &config.connection_string);
            driver
                .test_connection(&connection_string)
                .await
                .map_err(|e| {
                    LessorError::InvalidConfiguration(format!("error verifying connection: {e}"))
                })?;
            tracing::debug!("connection verified");
        }

        put_json(self.pools.storage().as_ref(), &config.storage_key(), &config).await?;
        self.pools.reset_db(&config.name).await?;

        tracing::info!(
            max_open = config.max_open_connections,
            max_idle = config.max_idle_connections,
            "connection configuration written"
        );
        Ok(())
    }

    /// Read a stored configuration; the connection string is returned as is
    pub async fn read_connection(&self, name: &str) -> Result<Option<ConnectionReadResponse>> {
        let config: Option<ConnectionConfig> =
            get_json(self.pools.storage().as_ref(), &connection_key(name)).await?;
        Ok(config.map(|config| ConnectionReadResponse {
            config,
            warnings: vec![SECRET_WARNING.to_string()],
        }))
    }

    /// Names of all stored configurations
    pub async fn list_connections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .pools
            .storage()
            .list(CONNECTION_PREFIX)
            .await?
            .into_iter()
            .filter(|name| !name.ends_with('/'))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Delete a stored configuration and close its pooled handle
    #[tracing::instrument(skip(self), fields(database = %name))]
    pub async fn delete_connection(&self, name: &str) -> Result<()> {
        self.pools.storage().delete(&connection_key(name)).await?;
        self.pools.forget(name).await?;
        tracing::info!("connection configuration deleted");
        Ok(())
    }
}
