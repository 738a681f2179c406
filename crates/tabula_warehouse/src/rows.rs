//! Result rows and schemas read through `gcp-bigquery-client` models.

use chrono::{DateTime, SecondsFormat};
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::query_response::{QueryResponse, ResultSet};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tabula_core::{FieldMode, FieldType, Row, SchemaField};
use tabula_error::{WarehouseError, WarehouseErrorKind, WarehouseResult};

/// One schema column under its REST field names.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FieldSpec {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    fields: Option<Vec<FieldSpec>>,
}

#[derive(Debug, Default, Deserialize)]
struct SchemaSpec {
    #[serde(default)]
    fields: Option<Vec<FieldSpec>>,
}

impl FieldSpec {
    fn kind(&self) -> FieldType {
        FieldType::from_warehouse(&self.field_type)
    }

    fn mode(&self) -> FieldMode {
        self.mode
            .as_deref()
            .and_then(|m| m.parse().ok())
            .unwrap_or_default()
    }

    fn children(&self) -> &[FieldSpec] {
        self.fields.as_deref().unwrap_or_default()
    }

    fn is_repeated(&self) -> bool {
        self.mode() == FieldMode::Repeated
    }
}

fn serialization_error(message: impl std::fmt::Display) -> WarehouseError {
    WarehouseError::new(WarehouseErrorKind::Serialization(message.to_string()))
}

/// Columns of a schema model (`TableSchema` or its JSON form).
pub(crate) fn field_specs<S: Serialize>(schema: &S) -> WarehouseResult<Vec<FieldSpec>> {
    let value = serde_json::to_value(schema).map_err(serialization_error)?;
    if value.is_null() {
        return Ok(Vec::new());
    }
    let spec: SchemaSpec = serde_json::from_value(value).map_err(serialization_error)?;
    Ok(spec.fields.unwrap_or_default())
}

/// Convert schema columns to console schema fields.
pub(crate) fn schema_fields(specs: &[FieldSpec]) -> Vec<SchemaField> {
    specs.iter().map(schema_field).collect()
}

fn schema_field(spec: &FieldSpec) -> SchemaField {
    let converted = match spec.kind() {
        FieldType::Record => SchemaField::record(
            spec.name.clone(),
            spec.mode(),
            spec.children().iter().map(schema_field).collect(),
        ),
        field_type => SchemaField::new(spec.name.clone(), field_type, spec.mode()),
    };
    converted.with_description(spec.description.clone())
}

/// Epoch milliseconds (as sent in resource metadata) to RFC 3339.
///
/// ```
/// use tabula_warehouse::millis_to_rfc3339;
///
/// assert_eq!(
///     millis_to_rfc3339("1672531200000").as_deref(),
///     Some("2023-01-01T00:00:00.000Z")
/// );
/// assert_eq!(millis_to_rfc3339("soon"), None);
/// ```
pub fn millis_to_rfc3339(millis: &str) -> Option<String> {
    let millis: i64 = millis.trim().parse().ok()?;
    DateTime::from_timestamp_millis(millis).map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Epoch seconds with fraction (as sent in query results) to RFC 3339.
fn seconds_to_rfc3339(seconds: f64) -> Option<String> {
    let micros = (seconds * 1_000_000.0).round() as i64;
    DateTime::from_timestamp_micros(micros).map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Decode every row of a query response into column-keyed records.
///
/// # Errors
///
/// Returns a serialization error if the schema cannot be read or a cell does
/// not match its declared type.
pub fn decode_response(response: QueryResponse) -> WarehouseResult<Vec<Row>> {
    let specs = field_specs(&response.schema)?;
    decode_rows(response, &specs)
}

pub(crate) fn decode_rows(response: QueryResponse, specs: &[FieldSpec]) -> WarehouseResult<Vec<Row>> {
    let mut result = ResultSet::new_from_query_response(response);
    let mut rows = Vec::new();
    while result.next_row() {
        let mut row = Row::new();
        for (index, spec) in specs.iter().enumerate() {
            let value = read_cell(&result, index, spec).map_err(serialization_error)?;
            row.insert(spec.name.clone(), value);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn read_cell(result: &ResultSet, index: usize, spec: &FieldSpec) -> Result<Value, BQError> {
    let field_type = spec.kind();
    if spec.is_repeated() || field_type == FieldType::Record {
        let raw = result.get_json_value(index)?.unwrap_or(Value::Null);
        return Ok(nested_cell(spec, &raw));
    }

    let value = match field_type {
        FieldType::Integer => result.get_i64(index)?.map(Value::from),
        FieldType::Float => result.get_f64(index)?.and_then(Number::from_f64).map(Value::Number),
        FieldType::Boolean => result.get_bool(index)?.map(Value::Bool),
        FieldType::Timestamp => match result.get_f64(index)? {
            Some(seconds) => seconds_to_rfc3339(seconds).map(Value::String),
            None => None,
        },
        _ => result.get_string(index)?.map(Value::String),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Scalars nested inside records and arrays arrive as `{"v": text}` cells.
fn nested_scalar(spec: &FieldSpec, raw: &Value) -> Value {
    let field_type = spec.kind();
    let text = match raw {
        Value::Null => return Value::Null,
        Value::String(s) => s.as_str(),
        Value::Object(record) if field_type == FieldType::Record => {
            return Value::Object(nested_record(spec.children(), record.get("f")));
        }
        other => return other.clone(),
    };

    let parsed = match field_type {
        FieldType::Integer => text.parse::<i64>().ok().map(Value::from),
        FieldType::Float => text.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number),
        FieldType::Boolean => match text {
            "true" | "TRUE" => Some(Value::Bool(true)),
            "false" | "FALSE" => Some(Value::Bool(false)),
            _ => None,
        },
        FieldType::Timestamp => text
            .parse::<f64>()
            .ok()
            .and_then(seconds_to_rfc3339)
            .map(Value::String),
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(text.to_string()))
}

fn nested_cell(spec: &FieldSpec, raw: &Value) -> Value {
    match raw {
        Value::Array(items) if spec.is_repeated() => Value::Array(
            items
                .iter()
                .map(|item| nested_scalar(spec, item.get("v").unwrap_or(&Value::Null)))
                .collect(),
        ),
        Value::Null if spec.is_repeated() => Value::Array(Vec::new()),
        other => nested_scalar(spec, other),
    }
}

fn nested_record(specs: &[FieldSpec], cells: Option<&Value>) -> Row {
    let cells = cells.and_then(Value::as_array);
    specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let raw = cells
                .and_then(|cells| cells.get(i))
                .and_then(|cell| cell.get("v"))
                .unwrap_or(&Value::Null);
            (spec.name.clone(), nested_cell(spec, raw))
        })
        .collect()
}
