//! Lessor Credentials - templated credential lifecycle
//!
//! Roles pair a database with `;` separated creation, revocation, rollback
//! and renewal statements. The `CredentialEngine` renders those statements
//! with a generated username, password and expiration and runs them through
//! the shared `ConnectionPoolManager`.

mod engine;
pub mod generator;
mod lease;
mod role;
pub mod template;

pub use engine::{Credential, CredentialEngine, CredentialLease};
pub use lease::{LEASE_CONFIG_KEY, LeaseConfig, read_lease, write_lease};
pub use role::{
    DEFAULT_DISPLAYNAME_LENGTH, DEFAULT_ROLENAME_LENGTH, DEFAULT_USERNAME_LENGTH, ROLE_PREFIX,
    RoleEntry, RoleService, role_key,
};
pub use template::{TemplateEngine, TemplateValues, split_statements};
