//! Connection trait for pooled database handles

use crate::Result;
use async_trait::async_trait;

/// Result of executing a statement that does not return rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatementResult {
    /// Number of rows affected, as reported by the server
    pub affected_rows: u64,
}

impl StatementResult {
    pub fn new(affected_rows: u64) -> Self {
        Self { affected_rows }
    }
}

/// A live handle to one database.
///
/// A handle owns whatever driver-side pool it needs; the pool manager keeps
/// at most one of them per configured name and replaces it wholesale on
/// reconnect.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "postgres", "mysql")
    fn driver_name(&self) -> &str;

    /// Check that the server still answers
    async fn ping(&self) -> Result<()> {
        self.execute("SELECT 1").await.map(|_| ())
    }

    /// Prepare a statement without executing it, failing if the server
    /// rejects its syntax.
    async fn prepare(&self, sql: &str) -> Result<()>;

    /// Execute a single statement
    async fn execute(&self, sql: &str) -> Result<StatementResult>;

    /// Close the handle and every physical connection behind it
    async fn close(&self) -> Result<()>;

    /// Check if the handle is closed
    fn is_closed(&self) -> bool;
}
