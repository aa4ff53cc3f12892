//! Capability traits for reaching a directory server
//!
//! The resolver and client only talk to these traits; [`crate::ldap`]
//! provides the production implementation.

use async_trait::async_trait;
use lessor_core::Result;

use crate::tls::TransportConfig;

/// How the byte stream to the server is secured
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Plain TCP
    Plain,
    /// Plain TCP upgraded with STARTTLS before any other operation
    StartTls(TransportConfig),
    /// TLS from the first byte (`ldaps`)
    Tls(TransportConfig),
}

impl Transport {
    pub fn is_encrypted(&self) -> bool {
        !matches!(self, Transport::Plain)
    }
}

/// One endpoint to dial
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialTarget {
    /// URL as configured, used in logs and errors
    pub url: String,
    pub host: String,
    pub port: u16,
    pub transport: Transport,
}

/// Subtree search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base_dn: String,
    pub filter: String,
}

/// Replace the given attributes of one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyRequest {
    pub dn: String,
    /// Attribute name and its complete new set of values
    pub replace: Vec<(String, Vec<Vec<u8>>)>,
}

/// A record as returned by the server, before field parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub dn: String,
    pub attributes: Vec<(String, Vec<String>)>,
}

/// Establishes connections to directory servers
#[async_trait]
pub trait DirectoryDialer: Send + Sync {
    async fn dial(&self, target: &DialTarget) -> Result<Box<dyn DirectoryConnection>>;
}

/// An established directory connection
#[async_trait]
pub trait DirectoryConnection: Send {
    async fn bind(&mut self, username: &str, password: &str) -> Result<()>;

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<RawEntry>>;

    async fn modify(&mut self, request: &ModifyRequest) -> Result<()>;

    /// Unbind and drop the connection
    async fn close(&mut self) -> Result<()>;
}
