//! PostgreSQL driver implementation

mod connection;
mod driver;
mod tls;

pub use connection::PostgresConnection;
pub use driver::PostgresDriver;
pub use tls::{TlsError, build_tls_connector};
