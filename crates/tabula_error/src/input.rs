//! Client input error types.

/// Conditions under which caller-supplied input is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum InputErrorKind {
    /// A structured parameter could not be parsed.
    #[display("Invalid {name} parameter: {message}")]
    MalformedParameter {
        /// Parameter name (e.g. `filters`)
        name: String,
        /// Parser message
        message: String,
    },
    /// A required parameter was missing or blank.
    #[display("Missing required parameter: {_0}")]
    MissingParameter(String),
    /// An identifier cannot be used in a query.
    #[display("Invalid identifier for {context}: {reason}")]
    InvalidIdentifier {
        /// What the identifier names (dataset, table, column)
        context: String,
        /// Why it was rejected
        reason: String,
    },
    /// A value does not match the declared type or operator shape.
    #[display("Invalid value for column '{column}': {message}")]
    InvalidValue {
        /// Column the value targets
        column: String,
        /// Why the value was rejected
        message: String,
    },
    /// A request body is structurally invalid.
    #[display("Invalid request: {_0}")]
    InvalidRequest(String),
}

/// Client input error with location tracking.
///
/// # Examples
///
/// ```
/// use tabula_error::{InputError, InputErrorKind};
///
/// let err = InputError::new(InputErrorKind::MissingParameter("datasetId".into()));
/// assert!(err.to_string().contains("datasetId"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Input Error: {} at line {} in {}", kind, line, file)]
pub struct InputError {
    /// The kind of error that occurred
    pub kind: InputErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl InputError {
    /// Create a new InputError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: InputErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for a malformed structured parameter.
    #[track_caller]
    pub fn malformed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(InputErrorKind::MalformedParameter {
            name: name.into(),
            message: message.into(),
        })
    }

    /// Shorthand for a value that does not fit its column.
    #[track_caller]
    pub fn invalid_value(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(InputErrorKind::InvalidValue {
            column: column.into(),
            message: message.into(),
        })
    }

    /// Get the error kind.
    pub fn kind(&self) -> &InputErrorKind {
        &self.kind
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for InputError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        InputError::new(InputErrorKind::InvalidRequest(err.to_string()))
    }
}
