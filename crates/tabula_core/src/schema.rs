//! Column schema types.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Declared column type.
///
/// Serialized with the warehouse's upper-case spelling. Legacy and GoogleSQL
/// aliases (`INT64`, `FLOAT64`, `BOOL`, ...) are folded onto one variant.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum FieldType {
    /// Text
    String,
    /// 64-bit integer
    #[serde(alias = "INT64")]
    #[strum(to_string = "INTEGER", serialize = "INT64")]
    Integer,
    /// Floating point
    #[serde(alias = "FLOAT64")]
    #[strum(to_string = "FLOAT", serialize = "FLOAT64")]
    Float,
    /// Exact decimal
    #[serde(alias = "BIGNUMERIC")]
    #[strum(to_string = "NUMERIC", serialize = "BIGNUMERIC")]
    Numeric,
    /// True/false
    #[serde(alias = "BOOL")]
    #[strum(to_string = "BOOLEAN", serialize = "BOOL")]
    Boolean,
    /// Absolute point in time
    Timestamp,
    /// Civil date-time without zone
    Datetime,
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Raw bytes
    Bytes,
    /// Nested record
    #[serde(alias = "STRUCT")]
    #[strum(to_string = "RECORD", serialize = "STRUCT")]
    Record,
    /// JSON document
    Json,
    /// Geography value
    Geography,
}

impl FieldType {
    /// Parse a warehouse type name, treating unknown names as text.
    pub fn from_warehouse(name: &str) -> Self {
        name.parse().unwrap_or(FieldType::String)
    }

    /// True for integer types, which decide how row keys are bound.
    pub fn is_integer(&self) -> bool {
        matches!(self, FieldType::Integer)
    }
}

/// Nullability mode of a column.
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
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum FieldMode {
    /// Value must be present
    Required,
    /// Value may be null
    #[default]
    Nullable,
    /// Value is an array
    Repeated,
}

/// One column in a table schema.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters, derive_builder::Builder,
)]
#[serde(rename_all = "camelCase")]
#[builder(setter(into))]
pub struct SchemaField {
    /// Column name
    name: String,
    /// Declared type
    #[serde(rename = "type")]
    field_type: FieldType,
    /// Nullability mode
    #[serde(default)]
    #[builder(default)]
    mode: FieldMode,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    description: Option<String>,
    /// Sub-fields of a record column
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    fields: Vec<SchemaField>,
}

impl SchemaField {
    /// A flat column.
    pub fn new(name: impl Into<String>, field_type: FieldType, mode: FieldMode) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode,
            description: None,
            fields: Vec::new(),
        }
    }

    /// A record column with nested fields.
    pub fn record(name: impl Into<String>, mode: FieldMode, fields: Vec<SchemaField>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Record,
            mode,
            description: None,
            fields,
        }
    }

    /// Attach a column description.
    pub fn with_description(self, description: Option<String>) -> Self {
        Self {
            description,
            ..self
        }
    }

    /// True when the column holds an array.
    pub fn is_repeated(&self) -> bool {
        self.mode == FieldMode::Repeated
    }
}
