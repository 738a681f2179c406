//! The remote datastore seam.

use crate::{ParameterizedQuery, QueryRows};
use async_trait::async_trait;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tabula_core::{Dataset, SchemaField, Table, TableKind};
use tabula_error::WarehouseResult;

/// A table as it appears in a dataset listing, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct TableRef {
    /// Table identifier
    id: String,
    /// Kind of relation
    kind: TableKind,
}

impl TableRef {
    /// Create a table reference.
    pub fn new(id: impl Into<String>, kind: TableKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// Metadata of one table: descriptor plus column schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct TableMetadata {
    /// Descriptor with warehouse-reported statistics
    table: Table,
    /// Column schema
    schema: Vec<SchemaField>,
    /// Whether the warehouse reported a byte size
    bytes_reported: bool,
}

impl TableMetadata {
    /// Create table metadata.
    pub fn new(table: Table, schema: Vec<SchemaField>, bytes_reported: bool) -> Self {
        Self {
            table,
            schema,
            bytes_reported,
        }
    }

    /// Split into descriptor and schema.
    pub fn into_parts(self) -> (Table, Vec<SchemaField>) {
        (self.table, self.schema)
    }
}

/// A remote warehouse reached by query submission.
///
/// Implementations own authentication and transport; callers only see
/// parameterized SQL and column-keyed rows.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Project the warehouse addresses.
    fn project_id(&self) -> &str;

    /// Datasets in the project.
    async fn list_datasets(&self) -> WarehouseResult<Vec<Dataset>>;

    /// Tables and views in a dataset.
    async fn list_tables(&self, dataset_id: &str) -> WarehouseResult<Vec<TableRef>>;

    /// Metadata and schema of one table.
    async fn table_metadata(&self, dataset_id: &str, table_id: &str)
    -> WarehouseResult<TableMetadata>;

    /// Execute a query, failing with a timeout error after `timeout`.
    async fn run_query(
        &self,
        query: &ParameterizedQuery,
        timeout: Duration,
    ) -> WarehouseResult<QueryRows>;
}
