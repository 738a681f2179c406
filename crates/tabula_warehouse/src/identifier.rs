//! Identifier sanitising and backtick quoting.

use tabula_error::{InputError, InputErrorKind};

/// Escape an identifier for use inside backticks.
///
/// Empty identifiers and identifiers containing control characters are
/// rejected. Backticks and backslashes are escaped with a backslash.
pub fn sanitize_identifier(identifier: &str, context: &str) -> Result<String, InputError> {
    if identifier.trim().is_empty() {
        return Err(InputError::new(InputErrorKind::InvalidIdentifier {
            context: context.to_string(),
            reason: "cannot be empty".to_string(),
        }));
    }

    if identifier.chars().any(char::is_control) {
        return Err(InputError::new(InputErrorKind::InvalidIdentifier {
            context: context.to_string(),
            reason: "contains control characters".to_string(),
        }));
    }

    let mut escaped = String::with_capacity(identifier.len());
    for ch in identifier.chars() {
        match ch {
            '`' => escaped.push_str("\\`"),
            '\\' => escaped.push_str("\\\\"),
            _ => escaped.push(ch),
        }
    }
    Ok(escaped)
}

/// Sanitise and wrap an identifier in backticks.
pub fn quote_identifier(identifier: &str, context: &str) -> Result<String, InputError> {
    sanitize_identifier(identifier, context).map(|name| format!("`{}`", name))
}

/// Fully qualified table a statement targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTarget {
    project: String,
    dataset: String,
    table: String,
}

impl TableTarget {
    /// Validate and sanitise the three parts of a table path.
    pub fn new(project: &str, dataset: &str, table: &str) -> Result<Self, InputError> {
        Ok(Self {
            project: sanitize_identifier(project, "project")?,
            dataset: sanitize_identifier(dataset, "dataset")?,
            table: sanitize_identifier(table, "table")?,
        })
    }

    /// Quoted `` `project.dataset.table` `` reference.
    pub fn reference(&self) -> String {
        format!("`{}.{}.{}`", self.project, self.dataset, self.table)
    }
}

/// Reject empty or control-character path parameters without building a
/// reference.
pub fn validate_path(dataset: &str, table: Option<&str>) -> Result<(), InputError> {
    sanitize_identifier(dataset, "dataset")?;
    if let Some(table) = table {
        sanitize_identifier(table, "table")?;
    }
    Ok(())
}
