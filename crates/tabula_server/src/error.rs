//! Mapping of errors to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tabula_error::{TabulaError, TabulaErrorKind, WarehouseErrorKind};
use tracing::{error, warn};

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Human-readable summary
    pub error: String,
    /// Underlying message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// When the error was produced
    pub timestamp: String,
    /// Path and query parameters of the failing request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// A failed request, rendered as `{error, details, timestamp, parameters}`.
#[derive(Debug)]
pub struct ApiError {
    error: TabulaError,
    parameters: Option<Value>,
}

impl ApiError {
    /// Wrap an error.
    pub fn new(error: impl Into<TabulaError>) -> Self {
        Self {
            error: error.into(),
            parameters: None,
        }
    }

    /// Echo the request parameters in the response body.
    pub fn with_parameters(self, parameters: Value) -> Self {
        Self {
            parameters: Some(parameters),
            ..self
        }
    }

    /// Client input errors are 400; everything else is 500.
    pub fn status(&self) -> StatusCode {
        if self.error.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn summary(&self) -> String {
        match self.error.kind() {
            TabulaErrorKind::Input(e) => e.kind.to_string(),
            TabulaErrorKind::Warehouse(e) => match e.kind() {
                WarehouseErrorKind::NotFound(_) => "Table or dataset not found",
                WarehouseErrorKind::PermissionDenied(_) => "Permission denied",
                WarehouseErrorKind::Timeout(_) => "Query timed out",
                _ => "Warehouse query failed",
            }
            .to_string(),
            TabulaErrorKind::Config(_) | TabulaErrorKind::Http(_) => {
                "Internal server error".to_string()
            }
        }
    }

    /// The response body.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.summary(),
            details: Some(self.error.detail()),
            timestamp: Utc::now().to_rfc3339(),
            parameters: self.parameters.clone(),
        }
    }
}

impl<T> From<T> for ApiError
where
    T: Into<TabulaError>,
{
    fn from(err: T) -> Self {
        Self::new(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            warn!(status = %status, error = %self.error, "Rejected request");
        } else {
            error!(status = %status, error = %self.error, "Request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
