//! Named connection pool
//!
//! Keeps at most one live handle per configured database name. A handle is
//! pinged before it is handed out again and replaced wholesale when the
//! ping fails.
//!
//! # Example
//!
//! ```ignore
//! use lessor_connection::pool::ConnectionPoolManager;
//!
//! let pools = ConnectionPoolManager::new(storage, Arc::new(DriverRegistry::with_defaults()));
//! let conn = pools.db_connection("main").await?;
//! conn.execute("CREATE ROLE ...").await?;
//! ```

mod manager;
mod pooled;

#[cfg(test)]
mod tests;

pub use manager::{ConnectionPoolManager, PoolEntryState, force_utc};
pub use pooled::PooledConnection;
