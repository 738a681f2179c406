//! Warehouse error types.

/// Warehouse error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum WarehouseErrorKind {
    /// Dataset, table or job does not exist
    #[display("Not found: {_0}")]
    NotFound(String),
    /// Credentials lack access to the resource
    #[display("Permission denied: {_0}")]
    PermissionDenied(String),
    /// Query did not finish within its timeout
    #[display("Query timed out: {_0}")]
    Timeout(String),
    /// Token could not be obtained or was rejected
    #[display("Authentication failed: {_0}")]
    Authentication(String),
    /// Warehouse could not be reached
    #[display("Connection error: {_0}")]
    Connection(String),
    /// Query was rejected or failed during execution
    #[display("Query error: {_0}")]
    Query(String),
    /// Response could not be decoded
    #[display("Serialization error: {_0}")]
    Serialization(String),
}

/// Warehouse error with source location tracking.
///
/// # Examples
///
/// ```
/// use tabula_error::{WarehouseError, WarehouseErrorKind};
///
/// let err = WarehouseError::new(WarehouseErrorKind::NotFound("hockey.players".into()));
/// assert!(err.is_not_found());
/// assert!(format!("{}", err).contains("hockey.players"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Warehouse Error: {} at line {} in {}", kind, line, file)]
pub struct WarehouseError {
    /// The kind of error that occurred
    pub kind: WarehouseErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl WarehouseError {
    /// Create a new WarehouseError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: WarehouseErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &WarehouseErrorKind {
        &self.kind
    }

    /// True when the remote reported a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, WarehouseErrorKind::NotFound(_))
    }

    /// True when the query exceeded its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, WarehouseErrorKind::Timeout(_))
    }

    /// The remote message without the kind prefix.
    pub fn message(&self) -> &str {
        match &self.kind {
            WarehouseErrorKind::NotFound(m)
            | WarehouseErrorKind::PermissionDenied(m)
            | WarehouseErrorKind::Timeout(m)
            | WarehouseErrorKind::Authentication(m)
            | WarehouseErrorKind::Connection(m)
            | WarehouseErrorKind::Query(m)
            | WarehouseErrorKind::Serialization(m) => m,
        }
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for WarehouseError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        WarehouseError::new(WarehouseErrorKind::Serialization(err.to_string()))
    }
}

/// Result type for warehouse operations.
pub type WarehouseResult<T> = Result<T, WarehouseError>;
