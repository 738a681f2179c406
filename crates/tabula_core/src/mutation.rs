//! Row mutation requests, bulk operations and their structural validation.

use crate::Row;
use derive_getters::Getters;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tabula_error::{InputError, InputErrorKind};

/// Kind of row operation.
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
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum OperationType {
    /// Add a row
    Insert,
    /// Change columns of an existing row
    Update,
    /// Remove a row
    Delete,
}

/// Accept row identifiers given as strings or numbers.
fn row_id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// One entry of a bulk request. The type stays raw so unknown types can be
/// reported per operation instead of failing the whole body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperation {
    /// Operation type as sent
    #[serde(rename = "type", default)]
    op_type: String,
    /// Identifier of the target row
    #[serde(
        default,
        deserialize_with = "row_id_string",
        skip_serializing_if = "Option::is_none"
    )]
    row_id: Option<String>,
    /// Column values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl BulkOperation {
    /// Create an operation.
    pub fn new(op_type: impl Into<String>, row_id: Option<String>, data: Option<Value>) -> Self {
        Self {
            op_type: op_type.into(),
            row_id,
            data,
        }
    }

    /// Parsed operation type, if recognised.
    pub fn operation_type(&self) -> Option<OperationType> {
        self.op_type.trim().parse().ok()
    }

    /// Column values as a record, if `data` is an object.
    pub fn record(&self) -> Option<&Row> {
        self.data.as_ref().and_then(Value::as_object)
    }

    /// Structural checks; nothing is executed.
    pub fn validate(&self, index: usize, id_column: &str) -> OperationValidation {
        let mut errors = Vec::new();
        let blank_row_id = self.row_id.as_deref().is_none_or(|id| id.trim().is_empty());

        match self.operation_type() {
            None => errors.push(format!(
                "Unknown operation type '{}', expected INSERT, UPDATE or DELETE",
                self.op_type
            )),
            Some(OperationType::Insert) => match self.record() {
                Some(record) if !record.is_empty() => {}
                _ => errors.push("INSERT requires a non-empty data object".to_string()),
            },
            Some(OperationType::Update) => {
                if blank_row_id {
                    errors.push("UPDATE requires a rowId".to_string());
                }
                match &self.data {
                    None | Some(Value::Null) => {}
                    Some(Value::Object(record)) => {
                        if record.contains_key(id_column) {
                            errors.push(format!("UPDATE cannot change '{}'", id_column));
                        }
                    }
                    Some(_) => errors.push("UPDATE data must be an object".to_string()),
                }
            }
            Some(OperationType::Delete) => {
                if blank_row_id {
                    errors.push("DELETE requires a rowId".to_string());
                }
            }
        }

        OperationValidation {
            index,
            op_type: self.op_type.clone(),
            row_id: self.row_id.clone(),
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validation verdict for one bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct OperationValidation {
    /// Position in the request
    index: usize,
    /// Operation type as sent
    #[serde(rename = "type")]
    op_type: String,
    /// Target row
    #[serde(skip_serializing_if = "Option::is_none")]
    row_id: Option<String>,
    /// True when no errors were found
    valid: bool,
    /// Problems found
    errors: Vec<String>,
}

/// Body of `PUT .../bulk`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    /// Operations in execution order
    #[serde(default)]
    operations: Vec<BulkOperation>,
    /// Validate without executing
    #[serde(default)]
    validate_only: bool,
    /// Stop at the first failure
    #[serde(default)]
    transactional: bool,
}

impl BulkRequest {
    /// Create a bulk request.
    pub fn new(operations: Vec<BulkOperation>, validate_only: bool, transactional: bool) -> Self {
        Self {
            operations,
            validate_only,
            transactional,
        }
    }
}

/// Result of a `validateOnly` bulk request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct BulkValidationReport {
    /// Always true
    validate_only: bool,
    /// True when every operation is valid
    all_valid: bool,
    /// Per-operation verdicts
    results: Vec<OperationValidation>,
}

/// Validate every operation of a bulk request.
pub fn validate_bulk(operations: &[BulkOperation], id_column: &str) -> BulkValidationReport {
    let results: Vec<OperationValidation> = operations
        .iter()
        .enumerate()
        .map(|(index, op)| op.validate(index, id_column))
        .collect();
    BulkValidationReport {
        validate_only: true,
        all_valid: results.iter().all(|r| r.valid),
        results,
    }
}

/// What happened to one bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperationStatus {
    /// Executed without error
    Succeeded,
    /// Invalid or rejected by the warehouse
    Failed,
    /// Not attempted because an earlier operation failed
    Skipped,
}

/// Execution result for one bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    /// Position in the request
    index: usize,
    /// Operation type as sent
    #[serde(rename = "type")]
    op_type: String,
    /// Target row
    #[serde(skip_serializing_if = "Option::is_none")]
    row_id: Option<String>,
    /// Outcome
    status: OperationStatus,
    /// Rows changed, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    affected_rows: Option<u64>,
    /// Failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl OperationResult {
    /// A successful operation.
    pub fn succeeded(index: usize, op: &BulkOperation, affected_rows: u64) -> Self {
        Self {
            index,
            op_type: op.op_type.clone(),
            row_id: op.row_id.clone(),
            status: OperationStatus::Succeeded,
            affected_rows: Some(affected_rows),
            error: None,
        }
    }

    /// A failed operation.
    pub fn failed(index: usize, op: &BulkOperation, error: impl Into<String>) -> Self {
        Self {
            index,
            op_type: op.op_type.clone(),
            row_id: op.row_id.clone(),
            status: OperationStatus::Failed,
            affected_rows: None,
            error: Some(error.into()),
        }
    }

    /// An operation that was not attempted.
    pub fn skipped(index: usize, op: &BulkOperation) -> Self {
        Self {
            index,
            op_type: op.op_type.clone(),
            row_id: op.row_id.clone(),
            status: OperationStatus::Skipped,
            affected_rows: None,
            error: None,
        }
    }
}

/// Result of an executed bulk request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct BulkExecutionReport {
    /// Always false
    validate_only: bool,
    /// Whether execution stopped at the first failure
    transactional: bool,
    /// True when the backend only simulated the writes
    simulated: bool,
    /// Operations that succeeded
    succeeded: usize,
    /// Operations that failed
    failed: usize,
    /// Operations not attempted
    skipped: usize,
    /// Per-operation results in request order
    results: Vec<OperationResult>,
}

impl BulkExecutionReport {
    /// Summarise per-operation results.
    pub fn new(results: Vec<OperationResult>, transactional: bool, simulated: bool) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        Self {
            validate_only: false,
            transactional,
            simulated,
            succeeded: count(OperationStatus::Succeeded),
            failed: count(OperationStatus::Failed),
            skipped: count(OperationStatus::Skipped),
            results,
        }
    }
}

/// Body of `PUT .../rows/:rowId`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct RowUpdateRequest {
    /// Column values to set
    #[serde(default)]
    data: Value,
    /// Validate without executing
    #[serde(default)]
    validate_only: bool,
}

impl RowUpdateRequest {
    /// Create an update request.
    pub fn new(data: Value, validate_only: bool) -> Self {
        Self {
            data,
            validate_only,
        }
    }

    /// Structural checks; nothing is executed.
    pub fn validate(&self, id_column: &str) -> RowValidation {
        let mut errors = Vec::new();
        let mut columns = Vec::new();
        match &self.data {
            Value::Object(record) if record.is_empty() => {
                errors.push("data must contain at least one column".to_string())
            }
            Value::Object(record) => {
                if record.contains_key(id_column) {
                    errors.push(format!("'{}' cannot be changed", id_column));
                }
                columns = record.keys().cloned().collect();
            }
            _ => errors.push("data must be an object".to_string()),
        }
        RowValidation {
            valid: errors.is_empty(),
            errors,
            columns,
        }
    }

    /// Column values, rejecting anything but a non-empty object.
    pub fn record(&self, id_column: &str) -> Result<&Row, InputError> {
        let verdict = self.validate(id_column);
        if !verdict.valid {
            return Err(InputError::new(InputErrorKind::InvalidRequest(
                verdict.errors.join("; "),
            )));
        }
        self.data
            .as_object()
            .ok_or_else(|| InputError::new(InputErrorKind::InvalidRequest("data must be an object".into())))
    }
}

/// Validation verdict for a single-row update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct RowValidation {
    /// True when no errors were found
    valid: bool,
    /// Problems found
    errors: Vec<String>,
    /// Columns the update would touch
    columns: Vec<String>,
}

/// Body of `POST .../rows`: one record as `data` or several as `rows`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertRequest {
    /// Single record
    #[serde(default)]
    pub data: Option<Row>,
    /// Several records
    #[serde(default)]
    pub rows: Option<Vec<Row>>,
}

impl InsertRequest {
    /// Records to insert; at least one non-empty record is required.
    pub fn into_records(self) -> Result<Vec<Row>, InputError> {
        let records: Vec<Row> = match (self.data, self.rows) {
            (_, Some(rows)) => rows,
            (Some(data), None) => vec![data],
            (None, None) => Vec::new(),
        };
        if records.is_empty() {
            return Err(InputError::new(InputErrorKind::InvalidRequest(
                "provide a record as 'data' or records as 'rows'".into(),
            )));
        }
        if records.iter().any(|r| r.is_empty()) {
            return Err(InputError::new(InputErrorKind::InvalidRequest(
                "records must contain at least one column".into(),
            )));
        }
        Ok(records)
    }
}

/// Outcome of a single-row mutation or insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    /// True when the write was accepted
    success: bool,
    /// True when the backend only simulated the write
    simulated: bool,
    /// Rows changed
    affected_rows: u64,
    /// Statement issued, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<String>,
    /// Human-readable summary
    message: String,
}

impl MutationOutcome {
    /// A write executed by the warehouse.
    pub fn executed(affected_rows: u64, query: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            simulated: false,
            affected_rows,
            query: Some(query.into()),
            message: message.into(),
        }
    }

    /// A write accepted without touching any data.
    pub fn simulated_write(affected_rows: u64, message: impl Into<String>) -> Self {
        Self {
            success: true,
            simulated: true,
            affected_rows,
            query: None,
            message: message.into(),
        }
    }
}
