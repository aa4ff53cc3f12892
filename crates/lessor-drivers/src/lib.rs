//! Lessor Drivers - Database driver implementations
//!
//! This crate provides concrete implementations of the driver traits defined
//! in `lessor-core`, plus the registry the pool manager resolves
//! `database_type` through.

#[cfg(feature = "mysql")]
pub use lessor_driver_mysql as mysql;
#[cfg(feature = "postgres")]
pub use lessor_driver_postgres as postgres;

mod registry;

pub use registry::DriverRegistry;

/// Re-export commonly used types from lessor-core
pub use lessor_core::{Connection, DatabaseDriver, LessorError, PoolLimits, Result, StatementResult};
