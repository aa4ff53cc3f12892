//! TLS configuration for directory connections
//!
//! Settings are validated once and then bound to each target host, so every
//! URL gets its own [`TransportConfig`] carrying the right server name.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use lessor_core::{LessorError, Result};
use native_tls::{Certificate, Protocol, TlsConnector};
use serde::{Deserialize, Serialize};
use url::Url;

/// TLS protocol versions accepted in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsVersion {
    Tls10,
    Tls11,
    Tls12,
}

impl TlsVersion {
    pub const DEFAULT: TlsVersion = TlsVersion::Tls12;

    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Tls10 => "tls10",
            TlsVersion::Tls11 => "tls11",
            TlsVersion::Tls12 => "tls12",
        }
    }

    fn protocol(&self) -> Protocol {
        match self {
            TlsVersion::Tls10 => Protocol::Tlsv10,
            TlsVersion::Tls11 => Protocol::Tlsv11,
            TlsVersion::Tls12 => Protocol::Tlsv12,
        }
    }

    /// Parse a configured version name, treating an empty value as the default
    pub fn parse_or_default(raw: &str, setting: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::DEFAULT);
        }
        raw.parse()
            .map_err(|_| LessorError::InvalidConfiguration(format!("invalid '{setting}' in config")))
    }
}

impl FromStr for TlsVersion {
    type Err = LessorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tls10" => Ok(TlsVersion::Tls10),
            "tls11" => Ok(TlsVersion::Tls11),
            "tls12" => Ok(TlsVersion::Tls12),
            other => Err(LessorError::InvalidConfiguration(format!(
                "unknown TLS version {other:?}, expected tls10, tls11 or tls12"
            ))),
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated TLS settings shared by every target URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    certificate: Option<String>,
    min_version: TlsVersion,
    max_version: TlsVersion,
    insecure_skip_verify: bool,
}

impl TlsSettings {
    /// Validate raw settings.
    ///
    /// Unknown version names and an inverted range are configuration errors;
    /// a malformed certificate is a certificate error.
    pub fn new(
        certificate: &str,
        min_version: &str,
        max_version: &str,
        insecure_skip_verify: bool,
    ) -> Result<Self> {
        let min_version = TlsVersion::parse_or_default(min_version, "tls_min_version")?;
        let max_version = TlsVersion::parse_or_default(max_version, "tls_max_version")?;
        if min_version > max_version {
            return Err(LessorError::InvalidConfiguration(
                "'tls_max_version' must be greater than or equal to 'tls_min_version'".into(),
            ));
        }

        let certificate = if certificate.trim().is_empty() {
            None
        } else {
            validate_certificate(certificate)?;
            Some(certificate.to_string())
        };

        Ok(Self {
            certificate,
            min_version,
            max_version,
            insecure_skip_verify,
        })
    }

    pub fn min_version(&self) -> TlsVersion {
        self.min_version
    }

    pub fn max_version(&self) -> TlsVersion {
        self.max_version
    }

    /// Bind these settings to one target host
    pub fn for_host(&self, server_name: &str) -> TransportConfig {
        TransportConfig {
            server_name: server_name.to_string(),
            min_version: self.min_version,
            max_version: self.max_version,
            insecure_skip_verify: self.insecure_skip_verify,
            root_certificate: self.certificate.clone(),
        }
    }

    /// Build one transport configuration per URL, keeping the given order.
    ///
    /// URLs without a host are skipped with a warning.
    pub fn for_urls(&self, urls: &[Url]) -> IndexMap<Url, TransportConfig> {
        let mut configs = IndexMap::with_capacity(urls.len());
        for url in urls {
            match url.host_str() {
                Some(host) if !host.is_empty() => {
                    configs.insert(url.clone(), self.for_host(host));
                }
                _ => tracing::warn!(url = %url, "url has no host, ignoring"),
            }
        }
        configs
    }
}

/// TLS parameters for one target host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub server_name: String,
    pub min_version: TlsVersion,
    pub max_version: TlsVersion,
    pub insecure_skip_verify: bool,
    /// PEM encoded CA certificate used as the trust root
    pub root_certificate: Option<String>,
}

impl TransportConfig {
    /// Build a native TLS connector honouring these parameters
    pub fn connector(&self) -> Result<TlsConnector> {
        let mut builder = TlsConnector::builder();
        builder
            .min_protocol_version(Some(self.min_version.protocol()))
            .max_protocol_version(Some(self.max_version.protocol()))
            .danger_accept_invalid_certs(self.insecure_skip_verify);

        if let Some(pem) = &self.root_certificate {
            let certificate = Certificate::from_pem(pem.as_bytes())
                .map_err(|e| LessorError::InvalidCertificate(e.to_string()))?;
            builder.add_root_certificate(certificate);
        }

        builder
            .build()
            .map_err(|e| LessorError::InvalidConfiguration(format!("failed to build TLS connector: {e}")))
    }
}

/// Check that `certificate` holds exactly one PEM `CERTIFICATE` block that
/// parses as X.509.
pub fn validate_certificate(certificate: &str) -> Result<()> {
    let blocks = pem::parse_many(certificate)
        .map_err(|e| LessorError::InvalidCertificate(format!("failed to decode PEM block in the certificate: {e}")))?;

    let block = match blocks.as_slice() {
        [block] => block,
        [] => {
            return Err(LessorError::InvalidCertificate(
                "failed to decode PEM block in the certificate".into(),
            ));
        }
        many => {
            return Err(LessorError::InvalidCertificate(format!(
                "expected exactly one PEM block, found {}",
                many.len()
            )));
        }
    };

    if block.tag() != "CERTIFICATE" {
        return Err(LessorError::InvalidCertificate(format!(
            "expected a CERTIFICATE PEM block, found {:?}",
            block.tag()
        )));
    }

    x509_parser::parse_x509_certificate(block.contents())
        .map_err(|e| LessorError::InvalidCertificate(format!("failed to parse certificate: {e}")))?;
    Ok(())
}
