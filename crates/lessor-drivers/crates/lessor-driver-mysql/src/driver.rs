//! MySQL driver implementation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lessor_core::{Connection, DatabaseDriver, LessorError, PoolLimits, Result};
use mysql_async::{Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts};

use crate::MySqlConnection;

/// Pins every session of the pool to UTC
const SESSION_TIMEZONE_INIT: &str = "SET time_zone = '+00:00'";

const INACTIVE_CONNECTION_TTL: Duration = Duration::from_secs(60);

/// MySQL/MariaDB database driver
pub struct MySqlDriver;

impl MySqlDriver {
    /// Create a new MySQL driver instance
    pub fn new() -> Self {
        tracing::debug!("MySQL driver initialized");
        Self
    }
}

impl Default for MySqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn pool_opts(limits: PoolLimits) -> Result<PoolOpts> {
    let max = limits.max_size().max(1);
    let min = limits.max_idle.min(max);
    let constraints = PoolConstraints::new(min, max).ok_or_else(|| {
        LessorError::InvalidConfiguration(format!(
            "Failed to configure MySQL pool constraints (min={}, max={})",
            min, max
        ))
    })?;
    Ok(PoolOpts::default()
        .with_constraints(constraints)
        .with_inactive_connection_ttl(INACTIVE_CONNECTION_TTL))
}

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn display_name(&self) -> &'static str {
        "MySQL"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["mariadb", "mysql-database-plugin"]
    }

    #[tracing::instrument(skip(self, connection_string), fields(max_open = ?limits.max_open, max_idle = limits.max_idle))]
    async fn open(
        &self,
        connection_string: &str,
        limits: PoolLimits,
    ) -> Result<Arc<dyn Connection>> {
        let opts = Opts::from_url(connection_string).map_err(|e| {
            LessorError::InvalidConfiguration(format!("invalid MySQL connection url: {e}"))
        })?;
        let opts: Opts = OptsBuilder::from_opts(opts)
            .init(vec![SESSION_TIMEZONE_INIT])
            .pool_opts(pool_opts(limits)?)
            .into();

        let pool = Pool::new(opts);
        tracing::info!("MySQL pool opened");
        Ok(Arc::new(MySqlConnection::new(pool)))
    }
}
