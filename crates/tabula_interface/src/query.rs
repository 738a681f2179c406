//! Parameterized queries and their results.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabula_core::Row;

/// A typed value bound to a named query parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "UPPERCASE")]
pub enum ParameterValue {
    /// `STRING`
    String(String),
    /// `INT64`
    Int64(i64),
    /// `FLOAT64`
    Float64(f64),
    /// `BOOL`
    Bool(bool),
    /// `DATE`, as `YYYY-MM-DD`
    Date(String),
    /// `TIMESTAMP`, as RFC 3339 or `YYYY-MM-DD HH:MM:SS`
    Timestamp(String),
    /// `ARRAY<element>`
    Array(Vec<ParameterValue>),
}

impl ParameterValue {
    /// GoogleSQL type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::String(_) => "STRING",
            ParameterValue::Int64(_) => "INT64",
            ParameterValue::Float64(_) => "FLOAT64",
            ParameterValue::Bool(_) => "BOOL",
            ParameterValue::Date(_) => "DATE",
            ParameterValue::Timestamp(_) => "TIMESTAMP",
            ParameterValue::Array(_) => "ARRAY",
        }
    }

    /// Element type of an array; empty arrays are typed `STRING`.
    pub fn element_type(&self) -> Option<&'static str> {
        match self {
            ParameterValue::Array(items) => {
                Some(items.first().map(ParameterValue::type_name).unwrap_or("STRING"))
            }
            _ => None,
        }
    }

    /// Value as the warehouse expects it on the wire (scalars as strings).
    pub fn wire_value(&self) -> Value {
        match self {
            ParameterValue::String(s) | ParameterValue::Date(s) | ParameterValue::Timestamp(s) => {
                Value::String(s.clone())
            }
            ParameterValue::Int64(n) => Value::String(n.to_string()),
            ParameterValue::Float64(f) => Value::String(f.to_string()),
            ParameterValue::Bool(b) => Value::String(b.to_string()),
            ParameterValue::Array(items) => {
                Value::Array(items.iter().map(ParameterValue::wire_value).collect())
            }
        }
    }

    /// Value as plain JSON, used by backends that evaluate in memory.
    pub fn json_value(&self) -> Value {
        match self {
            ParameterValue::String(s) | ParameterValue::Date(s) | ParameterValue::Timestamp(s) => {
                Value::String(s.clone())
            }
            ParameterValue::Int64(n) => Value::from(*n),
            ParameterValue::Float64(f) => Value::from(*f),
            ParameterValue::Bool(b) => Value::Bool(*b),
            ParameterValue::Array(items) => {
                Value::Array(items.iter().map(ParameterValue::json_value).collect())
            }
        }
    }
}

/// A named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct QueryParameter {
    /// Name without the `@` sigil
    name: String,
    /// Bound value
    value: ParameterValue,
}

/// SQL text plus the named parameters it references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters)]
pub struct ParameterizedQuery {
    /// Query text
    sql: String,
    /// Parameters in binding order
    parameters: Vec<QueryParameter>,
}

impl ParameterizedQuery {
    /// A query with no parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    /// Bind a value under the next free name and return its placeholder.
    ///
    /// ```
    /// use tabula_interface::{ParameterValue, ParameterizedQuery};
    ///
    /// let mut query = ParameterizedQuery::default();
    /// assert_eq!(query.bind(ParameterValue::Int64(1)), "@p0");
    /// assert_eq!(query.bind(ParameterValue::Bool(true)), "@p1");
    /// ```
    pub fn bind(&mut self, value: ParameterValue) -> String {
        let name = format!("p{}", self.parameters.len());
        let placeholder = format!("@{}", name);
        self.parameters.push(QueryParameter { name, value });
        placeholder
    }

    /// Replace the query text, keeping the bound parameters.
    pub fn with_sql(self, sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..self
        }
    }

    /// Look up a parameter value by name, with or without the `@` sigil.
    pub fn parameter(&self, name: &str) -> Option<&ParameterValue> {
        let name = name.trim_start_matches('@');
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

/// Rows returned by a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters)]
pub struct QueryRows {
    /// Column-keyed records
    rows: Vec<Row>,
    /// Total rows reported by the warehouse for the result
    total_rows: Option<u64>,
    /// Warehouse job identifier
    job_id: Option<String>,
    /// Rows changed by a DML statement
    affected_rows: Option<u64>,
}

impl QueryRows {
    /// Rows of a read.
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            total_rows: Some(rows.len() as u64),
            rows,
            job_id: None,
            affected_rows: None,
        }
    }

    /// Result of a DML statement.
    pub fn affected(count: u64) -> Self {
        Self {
            affected_rows: Some(count),
            ..Self::default()
        }
    }

    /// Attach the warehouse job identifier.
    pub fn with_job_id(self, job_id: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            ..self
        }
    }

    /// Attach the DML row count.
    pub fn with_affected_rows(self, affected_rows: Option<u64>) -> Self {
        Self {
            affected_rows,
            ..self
        }
    }

    /// Attach the reported total.
    pub fn with_total_rows(self, total_rows: Option<u64>) -> Self {
        Self { total_rows, ..self }
    }

    /// Take ownership of the records.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Integer value of `column` in the first row, for scalar queries such as counts.
    pub fn scalar_u64(&self, column: &str) -> Option<u64> {
        match self.rows.first()?.get(column)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}
