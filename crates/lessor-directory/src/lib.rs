//! Lessor Directory - LDAP/Active Directory access
//!
//! - `DirectoryConfig` - validated settings with one TLS configuration per URL
//! - `resolver` - tries configured URLs in order until one dials and binds
//! - `DirectoryClient` - search, attribute replacement, password and name updates
//! - `DirectoryDialer`/`DirectoryConnection` - the transport seam, with an
//!   ldap3 implementation in `LdapDialer`

mod client;
mod config;
pub mod dn;
mod entry;
mod field;
mod ldap;
mod name;
pub mod resolver;
pub mod tls;
mod transport;

pub use client::{DirectoryClient, encode_password};
pub use config::{
    DEFAULT_URL, DIRECTORY_CONFIG_KEY, DirectoryConfig, DirectorySettings, DirectorySettingsResponse,
    DirectorySettingsService,
};
pub use entry::DirectoryEntry;
pub use field::Field;
pub use ldap::LdapDialer;
pub use name::Username;
pub use tls::{TlsSettings, TlsVersion, TransportConfig};
pub use transport::{
    DialTarget, DirectoryConnection, DirectoryDialer, ModifyRequest, RawEntry, SearchRequest,
    Transport,
};
