//! Role definitions and their storage

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lessor_connection::ConnectionPoolManager;
use lessor_core::{LessorError, Result, get_json, put_json};
use serde::{Deserialize, Serialize};

use crate::generator::format_expiration;
use crate::template::{TemplateEngine, TemplateValues, split_statements};

/// Storage prefix under which roles live
pub const ROLE_PREFIX: &str = "role/";

pub const DEFAULT_USERNAME_LENGTH: usize = 16;
pub const DEFAULT_DISPLAYNAME_LENGTH: usize = 4;
pub const DEFAULT_ROLENAME_LENGTH: usize = 4;

fn default_username_length() -> usize {
    DEFAULT_USERNAME_LENGTH
}

fn default_displayname_length() -> usize {
    DEFAULT_DISPLAYNAME_LENGTH
}

fn default_rolename_length() -> usize {
    DEFAULT_ROLENAME_LENGTH
}

/// Storage key of the role called `name`
pub fn role_key(name: &str) -> String {
    format!("{ROLE_PREFIX}{name}")
}

/// A credential issuance policy bound to one database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    pub name: String,
    /// Connection configuration the role issues against
    pub database_name: String,
    /// `;` separated statements creating the principal
    pub creation_statements: String,
    #[serde(default)]
    pub revocation_statements: String,
    /// Statements undoing a partially failed creation
    #[serde(default)]
    pub rollback_statements: String,
    /// Statements run when a lease is extended
    #[serde(default)]
    pub renew_statements: String,
    /// Return a connection string carrying the new credential
    #[serde(default)]
    pub connection_template: bool,
    #[serde(default = "default_username_length")]
    pub username_length: usize,
    #[serde(default = "default_displayname_length")]
    pub displayname_length: usize,
    #[serde(default = "default_rolename_length")]
    pub rolename_length: usize,
    /// Lease TTL in seconds, `0` uses the lease configuration
    #[serde(default)]
    pub default_ttl: u64,
    /// Maximum lease lifetime in seconds, `0` uses the lease configuration
    #[serde(default)]
    pub max_ttl: u64,
}

impl RoleEntry {
    pub fn new(
        name: impl Into<String>,
        database_name: impl Into<String>,
        creation_statements: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            database_name: database_name.into(),
            creation_statements: creation_statements.into(),
            revocation_statements: String::new(),
            rollback_statements: String::new(),
            renew_statements: String::new(),
            connection_template: false,
            username_length: DEFAULT_USERNAME_LENGTH,
            displayname_length: DEFAULT_DISPLAYNAME_LENGTH,
            rolename_length: DEFAULT_ROLENAME_LENGTH,
            default_ttl: 0,
            max_ttl: 0,
        }
    }

    pub fn with_revocation_statements(mut self, statements: impl Into<String>) -> Self {
        self.revocation_statements = statements.into();
        self
    }

    pub fn with_rollback_statements(mut self, statements: impl Into<String>) -> Self {
        self.rollback_statements = statements.into();
        self
    }

    pub fn with_renew_statements(mut self, statements: impl Into<String>) -> Self {
        self.renew_statements = statements.into();
        self
    }

    pub fn with_connection_template(mut self, enabled: bool) -> Self {
        self.connection_template = enabled;
        self
    }

    pub fn with_name_lengths(mut self, username: usize, displayname: usize, rolename: usize) -> Self {
        self.username_length = username;
        self.displayname_length = displayname;
        self.rolename_length = rolename;
        self
    }

    pub fn with_ttls(mut self, default_ttl: Duration, max_ttl: Duration) -> Self {
        self.default_ttl = default_ttl.as_secs();
        self.max_ttl = max_ttl.as_secs();
        self
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        (self.default_ttl > 0).then(|| Duration::from_secs(self.default_ttl))
    }

    pub fn max_ttl(&self) -> Option<Duration> {
        (self.max_ttl > 0).then(|| Duration::from_secs(self.max_ttl))
    }

    pub fn storage_key(&self) -> String {
        role_key(&self.name)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LessorError::InvalidConfiguration("name is required".into()));
        }
        if self.name.contains('/') {
            return Err(LessorError::InvalidConfiguration("name cannot contain '/'".into()));
        }
        if self.database_name.trim().is_empty() {
            return Err(LessorError::InvalidConfiguration("database_name is required".into()));
        }
        if split_statements(&self.creation_statements).is_empty() {
            return Err(LessorError::InvalidConfiguration(
                "creation_statements must contain at least one statement".into(),
            ));
        }
        if self.username_length == 0 {
            return Err(LessorError::InvalidConfiguration(
                "username_length must be greater than zero".into(),
            ));
        }
        if let (Some(default_ttl), Some(max_ttl)) = (self.default_ttl(), self.max_ttl()) {
            if default_ttl > max_ttl {
                return Err(LessorError::InvalidConfiguration(
                    "default_ttl cannot be greater than max_ttl".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Writes, reads, lists and deletes roles
pub struct RoleService {
    pools: Arc<ConnectionPoolManager>,
    templates: TemplateEngine,
}

impl RoleService {
    pub fn new(pools: Arc<ConnectionPoolManager>) -> Result<Self> {
        Ok(Self {
            pools,
            templates: TemplateEngine::new()?,
        })
    }

    /// Validate a role and persist it.
    ///
    /// Every creation statement is rendered with sample values and prepared
    /// against the role's database; the role is only stored if all of them
    /// prepare.
    #[tracing::instrument(skip(self, role), fields(role = %role.name, database = %role.database_name))]
    pub async fn write_role(&self, role: RoleEntry) -> Result<()> {
        role.validate()?;

        let sample = TemplateValues::sample(format_expiration(Utc::now()));
        let creation = self.templates.render_all(&role.creation_statements, &sample)?;
        for statements in [
            &role.revocation_statements,
            &role.rollback_statements,
            &role.renew_statements,
        ] {
            self.templates.render_all(statements, &sample)?;
        }

        let conn = self.pools.db_connection(&role.database_name).await?;
        for statement in &creation {
            conn.prepare(statement)
                .await
                .map_err(|e| LessorError::InvalidTemplate(format!("error testing query: {e}")))?;
        }

        put_json(self.pools.storage().as_ref(), &role.storage_key(), &role).await?;
        tracing::info!(statements = creation.len(), "role written");
        Ok(())
    }

    pub async fn read_role(&self, name: &str) -> Result<Option<RoleEntry>> {
        load_role(self.pools.as_ref(), name).await
    }

    /// Names of all stored roles
    pub async fn list_roles(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .pools
            .storage()
            .list(ROLE_PREFIX)
            .await?
            .into_iter()
            .filter(|name| !name.ends_with('/'))
            .collect();
        names.sort();
        Ok(names)
    }

    #[tracing::instrument(skip(self), fields(role = %name))]
    pub async fn delete_role(&self, name: &str) -> Result<()> {
        self.pools.storage().delete(&role_key(name)).await?;
        tracing::info!("role deleted");
        Ok(())
    }
}

pub(crate) async fn load_role(pools: &ConnectionPoolManager, name: &str) -> Result<Option<RoleEntry>> {
    get_json(pools.storage().as_ref(), &role_key(name)).await
}
