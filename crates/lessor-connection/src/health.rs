//! Health check functionality for database connections
//!
//! # Example
//!
//! ```ignore
//! use lessor_connection::health::ping_connection;
//!
//! let latency = ping_connection(handle.as_ref(), Duration::from_secs(5)).await?;
//! ```

mod ping;


pub use ping::{DEFAULT_PING_TIMEOUT, PingError, PingResult, ping_connection};
