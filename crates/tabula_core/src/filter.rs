//! Column filter conditions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied by a filter.
///
/// Wire names follow the browser console (`startsWith`, `gte`, `notNull`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum FilterOperator {
    /// Exact equality
    Equals,
    /// Substring match
    Contains,
    /// Prefix match
    StartsWith,
    /// Suffix match
    EndsWith,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Inclusive range
    Between,
    /// Membership in a set
    In,
    /// Value is null
    IsNull,
    /// Value is present
    NotNull,
}

impl FilterOperator {
    /// True for operators that ignore the comparison value.
    pub fn is_unary(&self) -> bool {
        matches!(self, FilterOperator::IsNull | FilterOperator::NotNull)
    }
}

/// Declared type of a filter value, which decides how it is bound.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FilterDataType {
    /// Text; the only type bound as `STRING` for equality
    #[default]
    String,
    /// Integer or floating point
    Number,
    /// Calendar date or timestamp
    Date,
    /// True/false
    Boolean,
}

/// One column-level predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCondition {
    /// Client-side identifier, echoed back untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Target column
    pub column: String,
    /// Comparison
    pub operator: FilterOperator,
    /// Comparison value
    #[serde(default)]
    pub value: Value,
    /// Declared value type
    #[serde(default)]
    pub data_type: FilterDataType,
}

impl FilterCondition {
    /// Create a filter.
    pub fn new(
        column: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<Value>,
        data_type: FilterDataType,
    ) -> Self {
        Self {
            id: None,
            column: column.into(),
            operator,
            value: value.into(),
            data_type,
        }
    }

    /// Filter on a text value.
    pub fn text(column: impl Into<String>, operator: FilterOperator, value: &str) -> Self {
        Self::new(column, operator, value, FilterDataType::String)
    }

    /// Filter on a numeric value.
    pub fn number(column: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self::new(column, operator, value, FilterDataType::Number)
    }
}
