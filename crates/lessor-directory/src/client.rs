//! High level directory operations
//!
//! Every operation opens its own bound connection through the resolver and
//! closes it before returning.

use std::sync::Arc;

use lessor_core::{LessorError, Result, secret};

use crate::config::DirectoryConfig;
use crate::dn;
use crate::entry::DirectoryEntry;
use crate::field::Field;
use crate::ldap::LdapDialer;
use crate::name::Username;
use crate::resolver;
use crate::transport::{DirectoryConnection, DirectoryDialer, ModifyRequest, SearchRequest};

/// Client for one configured directory
pub struct DirectoryClient {
    config: DirectoryConfig,
    dialer: Arc<dyn DirectoryDialer>,
}

impl DirectoryClient {
    pub fn new(config: DirectoryConfig, dialer: Arc<dyn DirectoryDialer>) -> Self {
        Self { config, dialer }
    }

    /// Client that reaches the directory over ldap3
    pub fn with_ldap(config: DirectoryConfig) -> Self {
        Self::new(config, Arc::new(LdapDialer::new()))
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Subtree search below `base_dn` for entries matching every filter pair
    #[tracing::instrument(skip(self, base_dn, filters))]
    pub async fn search(
        &self,
        base_dn: &[(Field, &str)],
        filters: &[(Field, &str)],
    ) -> Result<Vec<DirectoryEntry>> {
        let request = SearchRequest {
            base_dn: dn::base_dn(base_dn),
            filter: dn::filter(filters),
        };

        let mut conn = self.connect().await?;
        let result = conn.search(&request).await;
        close(conn).await;

        let raw = result.map_err(|e| match e {
            LessorError::SearchFailed(_) => e,
            other => LessorError::SearchFailed(other.to_string()),
        })?;
        tracing::debug!(base_dn = %request.base_dn, filter = %request.filter, matches = raw.len(), "search complete");
        Ok(raw.into_iter().map(DirectoryEntry::from_raw).collect())
    }

    /// Replace attributes on the single entry the filters select
    pub async fn update_entry(
        &self,
        base_dn: &[(Field, &str)],
        filters: &[(Field, &str)],
        new_values: &[(Field, Vec<String>)],
    ) -> Result<()> {
        let replace = new_values
            .iter()
            .map(|(field, values)| {
                let values = values.iter().map(|v| v.as_bytes().to_vec()).collect();
                (field.as_str().to_string(), values)
            })
            .collect();
        self.modify_single(base_dn, filters, replace).await
    }

    /// Set a new password on the selected entry.
    ///
    /// Active Directory only accepts password writes over an encrypted
    /// session, so this is refused up front unless every connection is
    /// encrypted.
    #[tracing::instrument(skip(self, base_dn, filters, new_password))]
    pub async fn update_password(
        &self,
        base_dn: &[(Field, &str)],
        filters: &[(Field, &str)],
        new_password: &str,
    ) -> Result<()> {
        if !self.config.is_encrypted() {
            return Err(LessorError::InsecureChannel(
                "a TLS session must be in progress to update passwords, enable starttls or use ldaps urls".into(),
            ));
        }

        let replace = vec![(
            Field::UnicodePassword.as_str().to_string(),
            vec![encode_password(new_password)],
        )];
        self.modify_single(base_dn, filters, replace).await?;
        tracing::info!("directory password updated");
        Ok(())
    }

    /// Update displayName, givenName and sn of the selected entry.
    ///
    /// Login names (sAMAccountName, userPrincipalName) are left alone.
    pub async fn update_username(
        &self,
        base_dn: &[(Field, &str)],
        filters: &[(Field, &str)],
        username: &Username,
    ) -> Result<()> {
        username.validate()?;

        let new_values = [
            (Field::DisplayName, vec![username.full_name()]),
            (Field::GivenName, vec![username.first.clone()]),
            (Field::Surname, vec![username.last.clone()]),
        ];
        self.update_entry(base_dn, filters, &new_values).await
    }

    /// Generate a fresh password, apply it and hand it back
    pub async fn rotate_password(
        &self,
        base_dn: &[(Field, &str)],
        filters: &[(Field, &str)],
    ) -> Result<String> {
        let password = secret::generate_password();
        self.update_password(base_dn, filters, &password).await?;
        Ok(password)
    }

    async fn connect(&self) -> Result<Box<dyn DirectoryConnection>> {
        resolver::connect(&self.config, self.dialer.as_ref()).await
    }

    async fn modify_single(
        &self,
        base_dn: &[(Field, &str)],
        filters: &[(Field, &str)],
        replace: Vec<(String, Vec<Vec<u8>>)>,
    ) -> Result<()> {
        let entries = self.search(base_dn, filters).await?;
        let dn = match entries.as_slice() {
            [entry] => entry.dn().to_string(),
            _ => {
                return Err(LessorError::AmbiguousTarget(format!(
                    "filter {} matched {} entries, expected exactly one",
                    dn::filter(filters),
                    entries.len()
                )));
            }
        };

        let request = ModifyRequest { dn, replace };
        let mut conn = self.connect().await?;
        let result = conn.modify(&request).await;
        close(conn).await;
        result
    }
}

/// Encode a password the way Active Directory expects in `unicodePwd`:
/// UTF-16LE of the password wrapped in double quotes.
pub fn encode_password(password: &str) -> Vec<u8> {
    format!("\"{password}\"")
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect()
}

async fn close(mut conn: Box<dyn DirectoryConnection>) {
    if let Err(e) = conn.close().await {
        tracing::debug!(error = %e, "failed to close directory connection");
    }
}
