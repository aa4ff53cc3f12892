//! Database ping implementation

use std::time::{Duration, Instant};

use lessor_core::{Connection, LessorError};

/// Default upper bound on a single ping
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a ping operation
pub type PingResult = Result<Duration, PingError>;

/// Error that can occur during a ping operation
#[derive(Debug, Clone, thiserror::Error)]
pub enum PingError {
    /// The connection is closed
    #[error("Connection is closed")]
    ConnectionClosed,
    /// The ping itself failed
    #[error("Ping failed: {0}")]
    Failed(String),
    /// Ping timed out
    #[error("Ping timed out after {0:?}")]
    Timeout(Duration),
}

impl From<PingError> for LessorError {
    fn from(error: PingError) -> Self {
        LessorError::ConnectionFailure(error.to_string())
    }
}

/// Ping a handle and return the round-trip time.
///
/// A closed handle fails without touching the network.
pub async fn ping_connection(conn: &dyn Connection, timeout: Duration) -> PingResult {
    if conn.is_closed() {
        return Err(PingError::ConnectionClosed);
    }

    let start = Instant::now();
    match tokio::time::timeout(timeout, conn.ping()).await {
        Ok(Ok(())) => Ok(start.elapsed()),
        Ok(Err(e)) => Err(PingError::Failed(e.to_string())),
        Err(_) => Err(PingError::Timeout(timeout)),
    }
}
