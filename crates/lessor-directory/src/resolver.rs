//! Multi-URL connection establishment
//!
//! Targets are tried in configured order and the first one that both dials
//! and binds wins. Failures are only reported when every target failed.

use lessor_core::{ErrorList, LessorError, Result};
use url::Url;

use crate::config::DirectoryConfig;
use crate::tls::TransportConfig;
use crate::transport::{DialTarget, DirectoryConnection, DirectoryDialer, Transport};

pub const LDAP_PORT: u16 = 389;
pub const LDAPS_PORT: u16 = 636;

/// Work out how to reach `url`
pub fn dial_target(url: &Url, tls: &TransportConfig, start_tls: bool) -> Result<DialTarget> {
    let (port, transport) = match url.scheme() {
        "ldap" if start_tls => (LDAP_PORT, Transport::StartTls(tls.clone())),
        "ldap" => (LDAP_PORT, Transport::Plain),
        "ldaps" => (LDAPS_PORT, Transport::Tls(tls.clone())),
        _ => return Err(LessorError::UnsupportedScheme(url.to_string())),
    };

    Ok(DialTarget {
        url: url.to_string(),
        host: url.host_str().unwrap_or(&tls.server_name).to_string(),
        port: url.port().unwrap_or(port),
        transport,
    })
}

/// Dial and bind to the first reachable target
#[tracing::instrument(skip(config, dialer), fields(targets = config.targets().len()))]
pub async fn connect(
    config: &DirectoryConfig,
    dialer: &dyn DirectoryDialer,
) -> Result<Box<dyn DirectoryConnection>> {
    let mut errors = ErrorList::new();

    for (url, tls) in config.targets() {
        let target = match dial_target(url, tls, config.start_tls()) {
            Ok(target) => target,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };

        let mut conn = match dialer.dial(&target).await {
            Ok(conn) => conn,
            Err(e) => {
                errors.push(LessorError::ConnectionFailure(format!(
                    "error connecting to url {:?}: {e}",
                    url.as_str()
                )));
                continue;
            }
        };

        if !config.username().is_empty() {
            if let Err(e) = conn.bind(config.username(), config.password()).await {
                errors.push(LessorError::ConnectionFailure(format!(
                    "error binding to url {:?}: {e}",
                    url.as_str()
                )));
                if let Err(e) = conn.close().await {
                    tracing::debug!(url = %url, error = %e, "failed to close unbound connection");
                }
                continue;
            }
        }

        if !errors.is_empty() {
            tracing::debug!(errors = %errors, "errors connecting to some hosts");
        }
        tracing::debug!(url = %url, "directory connection established");
        return Ok(conn);
    }

    Err(LessorError::AllTargetsFailed(errors))
}
