//! Persisted connection configuration

use serde::{Deserialize, Serialize};

use crate::PoolLimits;

/// Storage prefix under which connection configurations live
pub const CONNECTION_PREFIX: &str = "dbs/";

const DEFAULT_MAX_OPEN: i64 = 2;

fn default_verify() -> bool {
    true
}

/// Configuration of one named database target
///
/// Pool sizing follows these rules once [`ConnectionConfig::normalized`] has
/// been applied:
/// - `max_open_connections < 0` means unlimited, `0` becomes 2
/// - `max_idle_connections == 0` becomes `max_open_connections`
/// - `max_idle_connections < 0` disables idle connections
/// - `max_idle_connections` never exceeds a bounded `max_open_connections`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Name the configuration is stored under
    pub name: String,
    /// Driver name or alias (e.g., "postgres", "mysql")
    pub database_type: String,
    /// Driver-specific connection string, may embed credentials
    pub connection_string: String,
    #[serde(default)]
    pub max_open_connections: i64,
    #[serde(default)]
    pub max_idle_connections: i64,
    /// Roles allowed to issue credentials against this database
    #[serde(default)]
    pub allowed_roles: Vec<String>,
    /// Open and ping the target before persisting
    #[serde(default = "default_verify")]
    pub verify_connection: bool,
}

impl ConnectionConfig {
    /// Create a new configuration with default pool limits
    pub fn new(
        name: impl Into<String>,
        database_type: impl Into<String>,
        connection_string: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            database_type: database_type.into(),
            connection_string: connection_string.into(),
            max_open_connections: 0,
            max_idle_connections: 0,
            allowed_roles: Vec::new(),
            verify_connection: true,
        }
    }

    pub fn with_max_open_connections(mut self, max_open: i64) -> Self {
        self.max_open_connections = max_open;
        self
    }

    pub fn with_max_idle_connections(mut self, max_idle: i64) -> Self {
        self.max_idle_connections = max_idle;
        self
    }

    /// Set the allowed roles from a comma separated list
    pub fn with_allowed_roles(mut self, roles: &str) -> Self {
        self.allowed_roles = parse_role_list(roles);
        self
    }

    pub fn with_verify_connection(mut self, verify: bool) -> Self {
        self.verify_connection = verify;
        self
    }

    /// Apply the pool sizing rules
    pub fn normalized(mut self) -> Self {
        if self.max_open_connections == 0 {
            self.max_open_connections = DEFAULT_MAX_OPEN;
        }
        if self.max_idle_connections == 0 {
            self.max_idle_connections = self.max_open_connections;
        }
        if self.max_open_connections > 0
            && self.max_idle_connections > self.max_open_connections
        {
            self.max_idle_connections = self.max_open_connections;
        }
        self
    }

    /// Limits to hand to the driver when opening a handle
    pub fn pool_limits(&self) -> PoolLimits {
        let normalized = self.clone().normalized();
        let max_open = usize::try_from(normalized.max_open_connections).ok();
        let max_idle = match usize::try_from(normalized.max_idle_connections) {
            Ok(idle) => match max_open {
                Some(open) => idle.min(open),
                None => idle,
            },
            Err(_) => 0,
        };
        PoolLimits { max_open, max_idle }
    }

    /// Check whether a role may issue credentials against this database.
    ///
    /// `*` allows every role; an empty list allows none.
    pub fn allows_role(&self, role: &str) -> bool {
        self.allowed_roles
            .iter()
            .any(|allowed| allowed == "*" || allowed == role)
    }

    /// Storage key for this configuration
    pub fn storage_key(&self) -> String {
        connection_key(&self.name)
    }
}

/// Storage key of the connection configuration called `name`
pub fn connection_key(name: &str) -> String {
    format!("{CONNECTION_PREFIX}{name}")
}

/// Split a comma separated role list, dropping blanks
pub fn parse_role_list(roles: &str) -> Vec<String> {
    roles
        .split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(str::to_string)
        .collect()
}
