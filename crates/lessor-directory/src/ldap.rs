//! ldap3 backed transport

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry};
use lessor_core::{LessorError, Result};

use crate::transport::{
    DialTarget, DirectoryConnection, DirectoryDialer, ModifyRequest, RawEntry, SearchRequest,
    Transport,
};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Dials directory servers with ldap3
///
/// ldap3 negotiates STARTTLS while it establishes the connection, so a
/// [`Transport::StartTls`] target is upgraded before the connection is
/// handed back.
#[derive(Debug, Clone)]
pub struct LdapDialer {
    connect_timeout: Duration,
}

impl LdapDialer {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for LdapDialer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectoryDialer for LdapDialer {
    #[tracing::instrument(skip(self, target), fields(url = %target.url))]
    async fn dial(&self, target: &DialTarget) -> Result<Box<dyn DirectoryConnection>> {
        let mut settings = LdapConnSettings::new().set_conn_timeout(self.connect_timeout);
        let scheme = match &target.transport {
            Transport::Plain => "ldap",
            Transport::StartTls(tls) => {
                settings = settings.set_starttls(true).set_connector(tls.connector()?);
                "ldap"
            }
            Transport::Tls(tls) => {
                settings = settings.set_connector(tls.connector()?);
                "ldaps"
            }
        };

        let address = format!("{}://{}:{}", scheme, target.host, target.port);
        let (conn, ldap) = LdapConnAsync::with_settings(settings, &address)
            .await
            .map_err(|e| LessorError::ConnectionFailure(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!(error = %e, "LDAP connection driver error");
            }
        });

        tracing::debug!(encrypted = target.transport.is_encrypted(), "connected to directory");
        Ok(Box::new(LdapConnection { ldap }))
    }
}

struct LdapConnection {
    ldap: Ldap,
}

#[async_trait]
impl DirectoryConnection for LdapConnection {
    async fn bind(&mut self, username: &str, password: &str) -> Result<()> {
        self.ldap
            .simple_bind(username, password)
            .await
            .and_then(|result| result.success())
            .map(|_| ())
            .map_err(|e| LessorError::ConnectionFailure(format!("bind failed: {e}")))
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<RawEntry>> {
        let (entries, _) = self
            .ldap
            .search(&request.base_dn, Scope::Subtree, &request.filter, vec!["*"])
            .await
            .and_then(|result| result.success())
            .map_err(|e| LessorError::SearchFailed(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| {
                let mut attributes: Vec<(String, Vec<String>)> = entry.attrs.into_iter().collect();
                attributes.extend(entry.bin_attrs.into_iter().map(|(name, values)| {
                    let values = values
                        .iter()
                        .map(|value| String::from_utf8_lossy(value).into_owned())
                        .collect();
                    (name, values)
                }));
                RawEntry {
                    dn: entry.dn,
                    attributes,
                }
            })
            .collect())
    }

    async fn modify(&mut self, request: &ModifyRequest) -> Result<()> {
        let mods: Vec<Mod<Vec<u8>>> = request
            .replace
            .iter()
            .map(|(name, values)| {
                Mod::Replace(
                    name.as_bytes().to_vec(),
                    values.iter().cloned().collect::<HashSet<_>>(),
                )
            })
            .collect();

        self.ldap
            .modify(&request.dn, mods)
            .await
            .and_then(|result| result.success())
            .map(|_| ())
            .map_err(|e| LessorError::ModifyFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.ldap
            .unbind()
            .await
            .map_err(|e| LessorError::ConnectionFailure(format!("unbind failed: {e}")))
    }
}
