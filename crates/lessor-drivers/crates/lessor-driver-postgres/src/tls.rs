//! PostgreSQL TLS Support
//!
//! The connector is always installed; `sslmode=disable` in the connection
//! string keeps tokio-postgres from negotiating TLS at all.

use native_tls::TlsConnector as NativeTlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::config::SslMode;
use tracing::debug;

/// Error types for TLS operations
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    ConfigurationError(String),
}

impl From<TlsError> for lessor_core::LessorError {
    fn from(error: TlsError) -> Self {
        lessor_core::LessorError::InvalidConfiguration(error.to_string())
    }
}

/// Build the TLS connector matching an `sslmode`.
///
/// `require` follows libpq and encrypts without verifying the server
/// certificate; the remaining modes verify it.
pub fn build_tls_connector(ssl_mode: SslMode) -> Result<MakeTlsConnector, TlsError> {
    let mut builder = NativeTlsConnector::builder();
    if ssl_mode == SslMode::Require {
        debug!("sslmode=require, server certificate is not verified");
        builder.danger_accept_invalid_certs(true);
        builder.danger_accept_invalid_hostnames(true);
    }
    let connector = builder
        .build()
        .map_err(|e| TlsError::ConfigurationError(e.to_string()))?;
    Ok(MakeTlsConnector::new(connector))
}
