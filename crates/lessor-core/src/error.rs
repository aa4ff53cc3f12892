//! Error types for Lessor

use std::fmt;

use thiserror::Error;

/// Core error type for Lessor operations
#[derive(Error, Debug)]
pub enum LessorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid name format: {0}")]
    InvalidNameFormat(String),

    #[error("Database {0:?} is not configured, write its connection configuration first")]
    NotConfigured(String),

    #[error("Connection error: {0}")]
    ConnectionFailure(String),

    #[error("Unsupported scheme in url {0:?}")]
    UnsupportedScheme(String),

    #[error("{0}")]
    AllTargetsFailed(ErrorList),

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Ambiguous target: {0}")]
    AmbiguousTarget(String),

    #[error("Modify failed: {0}")]
    ModifyFailed(String),

    #[error("Credential creation failed after {executed} statement(s) (rolled back: {rolled_back}): {source}")]
    PartialCreationFailure {
        executed: usize,
        rolled_back: bool,
        #[source]
        source: Box<LessorError>,
    },

    #[error("Insecure channel: {0}")]
    InsecureChannel(String),

    #[error("Role {role:?} is not allowed to use database {database:?}")]
    RoleNotAllowed { role: String, database: String },

    #[error("Object does not exist: {0}")]
    ObjectMissing(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl LessorError {
    /// Returns true for failures that a reconnect or failover may cure.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            LessorError::ConnectionFailure(_) | LessorError::AllTargetsFailed(_)
        )
    }
}

/// Result type alias for Lessor operations
pub type Result<T> = std::result::Result<T, LessorError>;

/// An ordered collection of errors collected while trying several targets.
///
/// Rendered the way operators are used to reading multi-target failures:
///
/// ```text
/// 2 errors occurred:
///     * Connection error: ldap://a: refused
///     * Unsupported scheme in url "http://b"
/// ```
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<LessorError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: LessorError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LessorError> {
        self.errors.iter()
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.len() {
            0 => write!(f, "no errors occurred"),
            1 => write!(f, "1 error occurred:\n\t* {}", self.errors[0]),
            n => {
                write!(f, "{} errors occurred:", n)?;
                for error in &self.errors {
                    write!(f, "\n\t* {}", error)?;
                }
                Ok(())
            }
        }
    }
}
