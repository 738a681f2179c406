//! Core data types for the Tabula warehouse console.
//!
//! This crate holds the value types shared by the query translator, the HTTP
//! surface and the console client: datasets and tables, filters and sorts,
//! the canonical data envelope, mutation requests and export helpers.

mod dataset;
mod envelope;
mod export;
mod filter;
mod mutation;
mod observability;
mod options;
mod schema;
mod sort;
mod table;

pub use dataset::{Dataset, DatasetBuilder};
pub use envelope::{Pagination, TableDataResponse, has_more};
pub use export::{
    EXPORT_DEFAULT_LIMIT, ExportFormat, ExportJob, ExportRequest, ExportStatus, column_order,
    rows_to_csv,
};
pub use filter::{FilterCondition, FilterDataType, FilterOperator};
pub use mutation::{
    BulkExecutionReport, BulkOperation, BulkRequest, BulkValidationReport, InsertRequest,
    MutationOutcome, OperationResult, OperationStatus, OperationType, OperationValidation,
    RowUpdateRequest, RowValidation, validate_bulk,
};
pub use observability::init_tracing;
pub use options::{DEFAULT_LIMIT, MAX_ROW_BOUND, TableDataOptions, TableDataOptionsBuilder};
pub use schema::{FieldMode, FieldType, SchemaField};
pub use sort::{SortCondition, SortDirection, by_priority};
pub use table::{Table, TableBuilder, TableDetails, TableKind, TableListQuery, editable_columns};

/// One result record keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;
