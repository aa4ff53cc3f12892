//! Directory settings and the validated configuration built from them

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use lessor_core::{LessorError, Result, Storage, get_json, put_json};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::tls::{TlsSettings, TlsVersion, TransportConfig};

/// Storage key of the persisted [`DirectorySettings`]
pub const DIRECTORY_CONFIG_KEY: &str = "config/directory";

pub const DEFAULT_URL: &str = "ldap://127.0.0.1";

const SECRET_WARNING: &str = "Read access to this endpoint should be controlled via ACLs as it will return the configuration information as-is, including any passwords.";

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_starttls() -> bool {
    true
}

fn default_tls_version() -> String {
    TlsVersion::DEFAULT.as_str().to_string()
}

/// Directory settings as written by an operator
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySettings {
    /// Comma separated `ldap://` or `ldaps://` URLs, tried in order
    #[serde(default = "default_url")]
    pub url: String,
    /// Bind DN or user principal with rights to administer passwords
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// PEM encoded CA certificate used to verify the server
    #[serde(default)]
    pub certificate: String,
    /// Skip server certificate verification
    #[serde(default)]
    pub insecure_tls: bool,
    #[serde(default = "default_tls_version")]
    pub tls_min_version: String,
    #[serde(default = "default_tls_version")]
    pub tls_max_version: String,
    /// Issue STARTTLS after connecting to an `ldap://` URL
    #[serde(default = "default_starttls")]
    pub starttls: bool,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: String::new(),
            password: String::new(),
            certificate: String::new(),
            insecure_tls: false,
            tls_min_version: default_tls_version(),
            tls_max_version: default_tls_version(),
            starttls: default_starttls(),
        }
    }
}

impl DirectorySettings {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_certificate(mut self, certificate: impl Into<String>) -> Self {
        self.certificate = certificate.into();
        self
    }

    pub fn with_insecure_tls(mut self, insecure: bool) -> Self {
        self.insecure_tls = insecure;
        self
    }

    pub fn with_tls_versions(mut self, min: impl Into<String>, max: impl Into<String>) -> Self {
        self.tls_min_version = min.into();
        self.tls_max_version = max.into();
        self
    }

    pub fn with_starttls(mut self, starttls: bool) -> Self {
        self.starttls = starttls;
        self
    }
}

impl fmt::Debug for DirectorySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectorySettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"*****")
            .field("certificate", &!self.certificate.is_empty())
            .field("insecure_tls", &self.insecure_tls)
            .field("tls_min_version", &self.tls_min_version)
            .field("tls_max_version", &self.tls_max_version)
            .field("starttls", &self.starttls)
            .finish()
    }
}

/// Validated directory configuration
#[derive(Clone)]
pub struct DirectoryConfig {
    username: String,
    password: String,
    start_tls: bool,
    targets: IndexMap<Url, TransportConfig>,
}

impl DirectoryConfig {
    /// Validate settings and bind a TLS configuration to each usable URL.
    ///
    /// URLs that fail to parse are logged and skipped; the configuration is
    /// rejected only when none are left.
    pub fn from_settings(settings: &DirectorySettings) -> Result<Self> {
        let tls = TlsSettings::new(
            &settings.certificate,
            &settings.tls_min_version,
            &settings.tls_max_version,
            settings.insecure_tls,
        )?;

        let urls = parse_urls(&settings.url);
        let targets = tls.for_urls(&urls);

        if settings.username.is_empty() {
            return Err(LessorError::InvalidConfiguration("username must be provided".into()));
        }
        if settings.password.is_empty() {
            return Err(LessorError::InvalidConfiguration("password must be provided".into()));
        }
        if targets.is_empty() {
            return Err(LessorError::InvalidConfiguration(
                "unable to parse any of the given urls".into(),
            ));
        }

        Ok(Self {
            username: settings.username.clone(),
            password: settings.password.clone(),
            start_tls: settings.starttls,
            targets,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn start_tls(&self) -> bool {
        self.start_tls
    }

    /// Target URLs in the order they are tried, each with its TLS parameters
    pub fn targets(&self) -> &IndexMap<Url, TransportConfig> {
        &self.targets
    }

    /// Whether every connection this configuration makes is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.start_tls || self.targets.keys().all(|url| url.scheme() == "ldaps")
    }
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("username", &self.username)
            .field("start_tls", &self.start_tls)
            .field("targets", &self.targets.keys().map(Url::as_str).collect::<Vec<_>>())
            .finish()
    }
}

fn parse_urls(raw: &str) -> Vec<Url> {
    raw.to_lowercase()
        .split(',')
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .filter_map(|candidate| match Url::parse(candidate) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(url = %candidate, error = %e, "unable to parse url, ignoring");
                None
            }
        })
        .collect()
}

/// Stored settings returned together with operator warnings
#[derive(Debug, Clone, Serialize)]
pub struct DirectorySettingsResponse {
    pub settings: DirectorySettings,
    pub warnings: Vec<String>,
}

/// Persists directory settings
pub struct DirectorySettingsService {
    storage: Arc<dyn Storage>,
}

impl DirectorySettingsService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Validate and persist settings, returning the configuration they build
    #[tracing::instrument(skip(self, settings), fields(url = %settings.url))]
    pub async fn write_settings(&self, settings: DirectorySettings) -> Result<DirectoryConfig> {
        let config = DirectoryConfig::from_settings(&settings)?;
        put_json(self.storage.as_ref(), DIRECTORY_CONFIG_KEY, &settings).await?;
        tracing::info!(targets = config.targets().len(), "directory settings written");
        Ok(config)
    }

    /// Read stored settings as they were written, password included
    pub async fn read_settings(&self) -> Result<Option<DirectorySettingsResponse>> {
        let settings: Option<DirectorySettings> =
            get_json(self.storage.as_ref(), DIRECTORY_CONFIG_KEY).await?;
        Ok(settings.map(|settings| DirectorySettingsResponse {
            settings,
            warnings: vec![SECRET_WARNING.to_string()],
        }))
    }

    /// Build the configuration from stored settings
    pub async fn load_config(&self) -> Result<DirectoryConfig> {
        let settings: DirectorySettings = get_json(self.storage.as_ref(), DIRECTORY_CONFIG_KEY)
            .await?
            .ok_or_else(|| LessorError::NotFound("directory settings have not been written".into()))?;
        DirectoryConfig::from_settings(&settings)
    }
}
