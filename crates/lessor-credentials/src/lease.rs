//! Default lease durations

use std::time::Duration;

use lessor_core::{LessorError, Result, Storage, get_json, put_json};
use serde::{Deserialize, Serialize};

/// Storage key of the [`LeaseConfig`]
pub const LEASE_CONFIG_KEY: &str = "config/lease";

const DEFAULT_TTL_SECS: u64 = 60 * 60;
const DEFAULT_MAX_TTL_SECS: u64 = 24 * 60 * 60;

fn default_ttl() -> u64 {
    DEFAULT_TTL_SECS
}

fn default_max_ttl() -> u64 {
    DEFAULT_MAX_TTL_SECS
}

/// Lease durations for roles that do not set their own, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseConfig {
    #[serde(default = "default_ttl")]
    pub ttl: u64,
    #[serde(default = "default_max_ttl")]
    pub max_ttl: u64,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL_SECS,
            max_ttl: DEFAULT_MAX_TTL_SECS,
        }
    }
}

impl LeaseConfig {
    pub fn new(ttl: Duration, max_ttl: Duration) -> Self {
        Self {
            ttl: ttl.as_secs(),
            max_ttl: max_ttl.as_secs(),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }

    pub fn max_ttl(&self) -> Duration {
        Duration::from_secs(self.max_ttl)
    }

    fn validate(&self) -> Result<()> {
        if self.ttl == 0 || self.max_ttl == 0 {
            return Err(LessorError::InvalidConfiguration(
                "ttl and max_ttl must be greater than zero".into(),
            ));
        }
        if self.ttl > self.max_ttl {
            return Err(LessorError::InvalidConfiguration(
                "ttl cannot be greater than max_ttl".into(),
            ));
        }
        Ok(())
    }
}

#[tracing::instrument(skip(storage))]
pub async fn write_lease(storage: &dyn Storage, config: LeaseConfig) -> Result<()> {
    config.validate()?;
    put_json(storage, LEASE_CONFIG_KEY, &config).await?;
    tracing::info!("lease configuration written");
    Ok(())
}

/// Stored lease configuration, or the defaults when none was written
pub async fn read_lease(storage: &dyn Storage) -> Result<LeaseConfig> {
    Ok(get_json(storage, LEASE_CONFIG_KEY).await?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lessor_core::MemoryStorage;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_defaults_when_absent() {
        let storage = MemoryStorage::new();
        let config = read_lease(&storage).await.unwrap();
        assert_eq!(config.ttl(), Duration::from_secs(3600));
        assert_eq!(config.max_ttl(), Duration::from_secs(86400));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let storage = MemoryStorage::new();
        let config = LeaseConfig::new(Duration::from_secs(300), Duration::from_secs(900));
        write_lease(&storage, config).await.unwrap();
        assert_eq!(read_lease(&storage).await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_inverted_lease_rejected() {
        let storage = MemoryStorage::new();
        let config = LeaseConfig::new(Duration::from_secs(900), Duration::from_secs(300));
        assert!(write_lease(&storage, config).await.is_err());
        assert!(storage.is_empty());
    }
}
