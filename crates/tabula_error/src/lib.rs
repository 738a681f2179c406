//! Error types for the Tabula warehouse console.
//!
//! Each concern has its own location-tracked error; [`TabulaError`] wraps
//! them for code that crosses concerns.

mod config;
mod http;
mod input;
mod warehouse;

pub use config::ConfigError;
pub use http::HttpError;
pub use input::{InputError, InputErrorKind};
pub use warehouse::{WarehouseError, WarehouseErrorKind, WarehouseResult};

/// Crate-level error variants.
#[derive(Debug, derive_more::From)]
pub enum TabulaErrorKind {
    /// Client input rejected at the boundary
    Input(InputError),
    /// Remote warehouse failure
    Warehouse(WarehouseError),
    /// Configuration error
    Config(ConfigError),
    /// HTTP client error
    Http(HttpError),
}

impl std::fmt::Display for TabulaErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TabulaErrorKind::Input(e) => write!(f, "{}", e),
            TabulaErrorKind::Warehouse(e) => write!(f, "{}", e),
            TabulaErrorKind::Config(e) => write!(f, "{}", e),
            TabulaErrorKind::Http(e) => write!(f, "{}", e),
        }
    }
}

/// Tabula error with kind discrimination.
#[derive(Debug)]
pub struct TabulaError(Box<TabulaErrorKind>);

impl TabulaError {
    /// Create a new error from a kind.
    pub fn new(kind: TabulaErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &TabulaErrorKind {
        &self.0
    }

    /// True when the caller sent something unusable (maps to HTTP 400).
    pub fn is_client_error(&self) -> bool {
        matches!(*self.0, TabulaErrorKind::Input(_))
    }

    /// The warehouse error, when this is one.
    pub fn as_warehouse(&self) -> Option<&WarehouseError> {
        match &*self.0 {
            TabulaErrorKind::Warehouse(e) => Some(e),
            _ => None,
        }
    }

    /// Message suitable for an operator, without location noise.
    pub fn detail(&self) -> String {
        match &*self.0 {
            TabulaErrorKind::Input(e) => e.kind.to_string(),
            TabulaErrorKind::Warehouse(e) => e.message().to_string(),
            TabulaErrorKind::Config(e) => e.message.clone(),
            TabulaErrorKind::Http(e) => e.message.clone(),
        }
    }
}

impl std::fmt::Display for TabulaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tabula Error: {}", self.0)
    }
}

impl std::error::Error for TabulaError {}

// Generic From implementation for any type that converts to TabulaErrorKind
impl<T> From<T> for TabulaError
where
    T: Into<TabulaErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Tabula operations.
pub type TabulaResult<T> = std::result::Result<T, TabulaError>;
