//! Lessor Connection - Named database connection management
//!
//! This crate keeps at most one live handle per configured database name,
//! health-checks it before reuse and owns the lifecycle of the persisted
//! connection configurations.

pub mod health;
pub mod pool;
mod service;

pub use health::{PingError, PingResult, ping_connection};
pub use pool::{ConnectionPoolManager, PoolEntryState, PooledConnection, force_utc};
pub use service::{ConnectionReadResponse, ConnectionService};
