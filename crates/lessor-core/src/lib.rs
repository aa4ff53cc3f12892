//! Lessor Core - Core abstractions shared by every Lessor crate
//!
//! This crate defines the pieces that the pool manager, the directory client
//! and the credential engine all agree on:
//!
//! - `DatabaseDriver` - Trait for SQL engine drivers
//! - `Connection` - Trait for a live, pooled handle to one database
//! - `Storage` - The key/value persistence collaborator
//! - `ConnectionConfig` - The persisted record describing a named database
//! - `LessorError` - The error taxonomy surfaced to callers

mod config;
mod connection;
pub mod connection_string;
mod driver;
mod error;
pub mod secret;
pub mod storage;

pub use config::*;
pub use connection::*;
pub use driver::*;
pub use error::*;
pub use storage::{FileStorage, MemoryStorage, Storage, get_json, put_json};
