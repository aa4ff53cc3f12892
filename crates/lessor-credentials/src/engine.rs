//! Credential issuance, renewal and revocation

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use lessor_connection::{ConnectionPoolManager, PooledConnection};
use lessor_core::{
    ConnectionConfig, LessorError, Result, connection_key, connection_string, get_json,
};
use serde::{Deserialize, Serialize};

use crate::generator::{format_expiration, generate_password, generate_username};
use crate::lease::read_lease;
use crate::role::{RoleEntry, load_role};
use crate::template::{TemplateEngine, TemplateValues};

/// A freshly issued credential
#[derive(Clone, Serialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
    /// Expiration as substituted into the creation statements
    pub expiration: String,
    pub lease_ttl: Duration,
    /// Connection string carrying the new credential, when the role allows it
    pub connection_url: Option<String>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"*****")
            .field("expiration", &self.expiration)
            .field("lease_ttl", &self.lease_ttl)
            .field("connection_url", &self.connection_url.as_deref().map(connection_string::redact))
            .finish()
    }
}

/// What the host keeps to renew or revoke an issued credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialLease {
    pub role_name: String,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Turns roles into principals on their target databases
pub struct CredentialEngine {
    pools: Arc<ConnectionPoolManager>,
    templates: TemplateEngine,
}

impl CredentialEngine {
    pub fn new(pools: Arc<ConnectionPoolManager>) -> Result<Self> {
        Ok(Self {
            pools,
            templates: TemplateEngine::new()?,
        })
    }

    /// Create a new principal for `role_name`.
    ///
    /// Creation statements run in order. When a statement after the first
    /// fails, the rollback statements run with the same values before the
    /// failure is returned.
    #[tracing::instrument(skip(self, display_name), fields(role = %role_name))]
    pub async fn issue_credential(
        &self,
        role_name: &str,
        display_name: &str,
    ) -> Result<(Credential, CredentialLease)> {
        let role = self.role(role_name).await?;

        let config: ConnectionConfig =
            get_json(self.pools.storage().as_ref(), &connection_key(&role.database_name))
                .await?
                .ok_or_else(|| LessorError::NotConfigured(role.database_name.clone()))?;
        if !config.allows_role(role_name) {
            return Err(LessorError::RoleNotAllowed {
                role: role_name.to_string(),
                database: role.database_name.clone(),
            });
        }

        let lease_ttl = self.lease_ttl(&role).await?;
        let issued_at = Utc::now();
        let expires_at = issued_at + to_delta(lease_ttl)?;

        let values = TemplateValues::new(
            generate_username(
                display_name,
                role_name,
                role.displayname_length,
                role.rolename_length,
                role.username_length,
            ),
            generate_password(),
            format_expiration(expires_at),
        );
        let creation = self.templates.render_all(&role.creation_statements, &values)?;

        let conn = self.pools.db_connection(&role.database_name).await?;
        for (executed, statement) in creation.iter().enumerate() {
            if let Err(e) = conn.execute(statement).await {
                if executed == 0 {
                    return Err(e);
                }
                tracing::warn!(executed, error = %e, "credential creation failed part way, rolling back");
                let rolled_back = self.rollback(&conn, &role, &values).await;
                return Err(LessorError::PartialCreationFailure {
                    executed,
                    rolled_back,
                    source: Box::new(e),
                });
            }
        }

        let connection_url = if role.connection_template {
            Some(connection_string::with_credentials(
                &conn.config().connection_string,
                &values.name,
                &values.password,
            )?)
        } else {
            None
        };

        tracing::info!(username = %values.name, expires_at = %values.expiration, "credential issued");
        let lease = CredentialLease {
            role_name: role_name.to_string(),
            username: values.name.clone(),
            issued_at,
            expires_at,
        };
        let credential = Credential {
            username: values.name,
            password: values.password,
            expiration: values.expiration,
            lease_ttl,
            connection_url,
        };
        Ok((credential, lease))
    }

    /// Extend a lease by `increment`, or by the role's TTL when zero.
    ///
    /// The new expiration never passes the maximum TTL counted from issue
    /// time.
    #[tracing::instrument(skip(self, lease), fields(role = %lease.role_name, username = %lease.username))]
    pub async fn renew_credential(
        &self,
        lease: &CredentialLease,
        increment: Duration,
    ) -> Result<CredentialLease> {
        let role = self.role(&lease.role_name).await?;
        let defaults = read_lease(self.pools.storage().as_ref()).await?;
        let max_ttl = role.max_ttl().unwrap_or_else(|| defaults.max_ttl());
        let increment = if increment.is_zero() {
            self.lease_ttl(&role).await?
        } else {
            increment
        };

        let now = Utc::now();
        let limit = lease.issued_at + to_delta(max_ttl)?;
        if limit <= now {
            return Err(LessorError::InvalidConfiguration(format!(
                "lease for {} has reached its maximum TTL",
                lease.username
            )));
        }
        let expires_at = (now + to_delta(increment)?).min(limit);

        let values = TemplateValues::new(lease.username.clone(), "", format_expiration(expires_at));
        let statements = self.templates.render_all(&role.renew_statements, &values)?;
        if !statements.is_empty() {
            let conn = self.pools.db_connection(&role.database_name).await?;
            for statement in &statements {
                conn.execute(statement).await?;
            }
        }

        tracing::info!(expires_at = %values.expiration, "credential renewed");
        Ok(CredentialLease {
            expires_at,
            ..lease.clone()
        })
    }

    /// Remove the principal behind a lease.
    ///
    /// A principal that no longer exists counts as revoked.
    #[tracing::instrument(skip(self, lease), fields(role = %lease.role_name, username = %lease.username))]
    pub async fn revoke_credential(&self, lease: &CredentialLease) -> Result<()> {
        let role = self.role(&lease.role_name).await?;

        let values = TemplateValues::new(lease.username.clone(), "", "");
        let statements = self.templates.render_all(&role.revocation_statements, &values)?;
        if statements.is_empty() {
            tracing::warn!("role has no revocation statements, nothing to revoke");
            return Ok(());
        }

        let conn = self.pools.db_connection(&role.database_name).await?;
        for statement in &statements {
            match conn.execute(statement).await {
                Ok(_) => {}
                Err(LessorError::ObjectMissing(message)) => {
                    tracing::debug!(%message, "principal already gone");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!("credential revoked");
        Ok(())
    }

    async fn role(&self, name: &str) -> Result<RoleEntry> {
        load_role(self.pools.as_ref(), name)
            .await?
            .ok_or_else(|| LessorError::NotFound(format!("unknown role: {name}")))
    }

    async fn lease_ttl(&self, role: &RoleEntry) -> Result<Duration> {
        let defaults = read_lease(self.pools.storage().as_ref()).await?;
        let ttl = role.default_ttl().unwrap_or_else(|| defaults.ttl());
        let max_ttl = role.max_ttl().unwrap_or_else(|| defaults.max_ttl());
        Ok(ttl.min(max_ttl))
    }

    /// Run the rollback statements, returning whether all of them succeeded
    async fn rollback(&self, conn: &PooledConnection, role: &RoleEntry, values: &TemplateValues) -> bool {
        let statements = match self.templates.render_all(&role.rollback_statements, values) {
            Ok(statements) => statements,
            Err(e) => {
                tracing::error!(error = %e, "failed to render rollback statements");
                return false;
            }
        };
        if statements.is_empty() {
            tracing::warn!("role has no rollback statements");
            return false;
        }

        let mut succeeded = true;
        for statement in &statements {
            if let Err(e) = conn.execute(statement).await {
                tracing::error!(error = %e, "rollback statement failed");
                succeeded = false;
            }
        }
        succeeded
    }
}

fn to_delta(duration: Duration) -> Result<TimeDelta> {
    TimeDelta::from_std(duration)
        .map_err(|e| LessorError::InvalidConfiguration(format!("invalid lease duration: {e}")))
}
