//! Table operations over a connected warehouse or fixture data.
//!
//! Every operation branches once on [`WarehouseBackend`]; callers see the
//! same response shapes either way.

use crate::fixtures;
use crate::identifier::{TableTarget, validate_path};
use crate::translate::{
    bind_filter, count_query, delete_statement, insert_statement, key_parameter, select_query,
    table_count_query, update_statement,
};
use chrono::Utc;
use derive_getters::Getters;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tabula_core::{
    BulkExecutionReport, BulkRequest, BulkValidationReport, Dataset, ExportJob, ExportRequest,
    InsertRequest, MutationOutcome, OperationResult, OperationType, Row, RowUpdateRequest,
    RowValidation, Table, TableDataOptions, TableDataResponse, TableDetails, TableListQuery,
    validate_bulk,
};
use tabula_error::{InputError, InputErrorKind, TabulaResult};
use tabula_interface::{TableRef, Warehouse};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Where table operations are served from.
#[derive(Clone)]
pub enum WarehouseBackend {
    /// A reachable, credentialed warehouse
    Connected(Arc<dyn Warehouse>),
    /// No warehouse; deterministic fixture data
    Unavailable,
}

impl std::fmt::Debug for WarehouseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarehouseBackend::Connected(w) => f
                .debug_tuple("Connected")
                .field(&w.project_id())
                .finish(),
            WarehouseBackend::Unavailable => f.write_str("Unavailable"),
        }
    }
}

impl WarehouseBackend {
    /// `warehouse` or `fixture`.
    pub fn name(&self) -> &'static str {
        match self {
            WarehouseBackend::Connected(_) => "warehouse",
            WarehouseBackend::Unavailable => "fixture",
        }
    }

    /// True for a connected warehouse.
    pub fn is_connected(&self) -> bool {
        matches!(self, WarehouseBackend::Connected(_))
    }
}

/// Limits and naming used by [`TableService`].
#[derive(Debug, Clone, PartialEq, Eq, Getters, derive_builder::Builder)]
#[builder(setter(into))]
pub struct ServiceSettings {
    /// Deadline for data queries and DML
    #[builder(default = "Duration::from_millis(60_000)")]
    query_timeout: Duration,
    /// Deadline for count queries
    #[builder(default = "Duration::from_millis(30_000)")]
    count_timeout: Duration,
    /// Key column for single-row mutations
    #[builder(default = "\"id\".to_string()")]
    id_column: String,
    /// Upper bound on page size
    #[builder(default)]
    max_limit: Option<u64>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_millis(60_000),
            count_timeout: Duration::from_millis(30_000),
            id_column: "id".to_string(),
            max_limit: None,
        }
    }
}

impl ServiceSettings {
    /// Start building settings from the defaults.
    pub fn builder() -> ServiceSettingsBuilder {
        ServiceSettingsBuilder::default()
    }
}

/// Reply to a single-row update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RowUpdateResponse {
    /// `validateOnly` verdict
    Validation {
        /// Always true
        #[serde(rename = "validateOnly")]
        validate_only: bool,
        /// Verdict
        #[serde(flatten)]
        validation: RowValidation,
    },
    /// Executed or simulated update
    Applied(MutationOutcome),
}

/// Reply to a bulk request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BulkResponse {
    /// `validateOnly` verdicts
    Validation(BulkValidationReport),
    /// Per-operation execution results
    Executed(BulkExecutionReport),
}

/// Dataset, table and row operations.
#[derive(Debug, Clone)]
pub struct TableService {
    backend: WarehouseBackend,
    settings: ServiceSettings,
}

impl TableService {
    /// Create a service over `backend`.
    pub fn new(backend: WarehouseBackend, settings: ServiceSettings) -> Self {
        Self { backend, settings }
    }

    /// Active backend.
    pub fn backend(&self) -> &WarehouseBackend {
        &self.backend
    }

    /// Active settings.
    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Datasets in the project.
    #[instrument(skip(self), fields(backend = self.backend.name()))]
    pub async fn list_datasets(&self) -> TabulaResult<Vec<Dataset>> {
        match &self.backend {
            WarehouseBackend::Unavailable => Ok(fixtures::datasets()),
            WarehouseBackend::Connected(warehouse) => Ok(warehouse.list_datasets().await?),
        }
    }

    /// Tables of a dataset with best-effort statistics, then search, kind,
    /// offset and limit.
    #[instrument(skip(self, query), fields(backend = self.backend.name()))]
    pub async fn list_tables(
        &self,
        dataset_id: &str,
        query: &TableListQuery,
    ) -> TabulaResult<Vec<Table>> {
        validate_path(dataset_id, None)?;
        let tables = match &self.backend {
            WarehouseBackend::Unavailable => fixtures::tables(dataset_id),
            WarehouseBackend::Connected(warehouse) => {
                let refs = warehouse.list_tables(dataset_id).await?;
                join_all(
                    refs.iter()
                        .map(|table| self.enrich_table(warehouse.as_ref(), dataset_id, table)),
                )
                .await
            }
        };
        debug!(count = tables.len(), "Tables before listing controls");
        Ok(query.apply(tables))
    }

    async fn enrich_table(&self, warehouse: &dyn Warehouse, dataset_id: &str, table: &TableRef) -> Table {
        let table_id = table.id();
        let metadata = match warehouse.table_metadata(dataset_id, table_id).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(table_id = %table_id, error = %e, "Table metadata unavailable, using zeroed entry");
                return Table::placeholder(table_id);
            }
        };
        let bytes_reported = *metadata.bytes_reported();
        let (described, _) = metadata.into_parts();
        if described.kind().is_view() {
            return described.with_stats(0, 0);
        }

        let counted = match TableTarget::new(warehouse.project_id(), dataset_id, table_id) {
            Ok(target) => {
                match warehouse
                    .run_query(&table_count_query(&target), self.settings.count_timeout)
                    .await
                {
                    Ok(rows) => rows.scalar_u64("total"),
                    Err(e) => {
                        warn!(table_id = %table_id, error = %e, "Row count failed, using metadata");
                        None
                    }
                }
            }
            Err(e) => {
                warn!(table_id = %table_id, error = %e, "Table identifier cannot be queried");
                None
            }
        };

        let rows = counted.unwrap_or(*described.num_rows());
        let bytes = if bytes_reported {
            *described.num_bytes()
        } else {
            rows.saturating_mul(100)
        };
        described.with_stats(rows, bytes)
    }

    /// Table metadata, schema and editable columns.
    #[instrument(skip(self), fields(backend = self.backend.name()))]
    pub async fn table_details(&self, dataset_id: &str, table_id: &str) -> TabulaResult<TableDetails> {
        let id_column = self.settings.id_column.as_str();
        match &self.backend {
            WarehouseBackend::Unavailable => {
                Ok(fixtures::table_details(dataset_id, table_id, id_column)?)
            }
            WarehouseBackend::Connected(warehouse) => {
                validate_path(dataset_id, Some(table_id))?;
                let (table, schema) = warehouse
                    .table_metadata(dataset_id, table_id)
                    .await?
                    .into_parts();
                Ok(TableDetails::new(table, schema, id_column))
            }
        }
    }

    /// One page of table rows in the canonical envelope.
    ///
    /// The data and count queries run concurrently; a failed count falls back
    /// to the returned row count.
    #[instrument(
        skip(self, options),
        fields(backend = self.backend.name(), limit = *options.limit(), offset = *options.offset())
    )]
    pub async fn table_data(
        &self,
        dataset_id: &str,
        table_id: &str,
        options: TableDataOptions,
    ) -> TabulaResult<TableDataResponse> {
        let options = options.clamp_limit(self.settings.max_limit);
        let started = Instant::now();

        match &self.backend {
            WarehouseBackend::Unavailable => {
                let (rows, total) = fixtures::page(dataset_id, table_id, &options)?;
                Ok(TableDataResponse::assemble(
                    rows,
                    &options,
                    Some(total),
                    fixtures::query_text(dataset_id, table_id),
                    Some(started.elapsed()),
                ))
            }
            WarehouseBackend::Connected(warehouse) => {
                let target = TableTarget::new(warehouse.project_id(), dataset_id, table_id)?;
                let select = select_query(&target, &options)?;
                let count = count_query(&target, &options)?;
                debug!(
                    sql = %select.sql(),
                    params = select.parameters().len(),
                    "Issuing data and count queries"
                );

                let (data, total) = tokio::join!(
                    warehouse.run_query(&select, self.settings.query_timeout),
                    warehouse.run_query(&count, self.settings.count_timeout),
                );
                let data = data?;
                let total = match total {
                    Ok(rows) => rows.scalar_u64("total"),
                    Err(e) => {
                        warn!(error = %e, "Count query failed, using returned row count");
                        None
                    }
                };

                Ok(TableDataResponse::assemble(
                    data.into_rows(),
                    &options,
                    total,
                    select.sql().clone(),
                    Some(started.elapsed()),
                ))
            }
        }
    }

    /// Rows for a download, with the same semantics as a data read.
    #[instrument(skip(self, options), fields(backend = self.backend.name()))]
    pub async fn export_rows(
        &self,
        dataset_id: &str,
        table_id: &str,
        options: TableDataOptions,
    ) -> TabulaResult<Vec<Row>> {
        Ok(self
            .table_data(dataset_id, table_id, options)
            .await?
            .into_data())
    }

    /// Register an export and describe where to download it.
    #[instrument(skip(self, request), fields(backend = self.backend.name()))]
    pub fn start_export(
        &self,
        dataset_id: &str,
        table_id: &str,
        request: &ExportRequest,
    ) -> TabulaResult<ExportJob> {
        validate_path(dataset_id, Some(table_id))?;
        for filter in &request.filters {
            bind_filter(filter)?;
        }
        let job = ExportJob::pending(
            Uuid::new_v4().to_string(),
            dataset_id,
            table_id,
            request,
            Utc::now().to_rfc3339(),
        )?;
        info!(job_id = %job.job_id(), format = %job.format(), "Export job created");
        Ok(job)
    }

    async fn integer_key(&self, warehouse: &dyn Warehouse, dataset_id: &str, table_id: &str) -> bool {
        let id_column = self.settings.id_column.as_str();
        match warehouse.table_metadata(dataset_id, table_id).await {
            Ok(metadata) => metadata
                .schema()
                .iter()
                .find(|field| field.name() == id_column)
                .is_some_and(|field| field.field_type().is_integer()),
            Err(e) => {
                warn!(error = %e, "Schema unavailable, binding row identifiers as STRING");
                false
            }
        }
    }

    /// Insert one or more records.
    #[instrument(skip(self, request), fields(backend = self.backend.name()))]
    pub async fn insert_rows(
        &self,
        dataset_id: &str,
        table_id: &str,
        request: InsertRequest,
    ) -> TabulaResult<MutationOutcome> {
        validate_path(dataset_id, Some(table_id))?;
        let records = request.into_records()?;
        let count = records.len() as u64;

        match &self.backend {
            WarehouseBackend::Unavailable => {
                info!(rows = count, "Simulated insert");
                Ok(MutationOutcome::simulated_write(
                    count,
                    format!(
                        "Simulated insert of {} row(s) into {}.{}; no data was changed",
                        count, dataset_id, table_id
                    ),
                ))
            }
            WarehouseBackend::Connected(warehouse) => {
                let target = TableTarget::new(warehouse.project_id(), dataset_id, table_id)?;
                let statement = insert_statement(&target, &records)?;
                let result = warehouse
                    .run_query(&statement, self.settings.query_timeout)
                    .await?;
                let affected = result.affected_rows().unwrap_or(count);
                info!(rows = affected, "Inserted rows");
                Ok(MutationOutcome::executed(
                    affected,
                    statement.sql().clone(),
                    format!("Inserted {} row(s) into {}.{}", affected, dataset_id, table_id),
                ))
            }
        }
    }

    /// Update one row by identifier, or only validate the update.
    #[instrument(skip(self, request), fields(backend = self.backend.name()))]
    pub async fn update_row(
        &self,
        dataset_id: &str,
        table_id: &str,
        row_id: &str,
        request: RowUpdateRequest,
    ) -> TabulaResult<RowUpdateResponse> {
        validate_path(dataset_id, Some(table_id))?;
        let id_column = self.settings.id_column.as_str();

        if *request.validate_only() {
            return Ok(RowUpdateResponse::Validation {
                validate_only: true,
                validation: request.validate(id_column),
            });
        }
        let data = request.record(id_column)?;

        match &self.backend {
            WarehouseBackend::Unavailable => {
                key_parameter(id_column, row_id, false)?;
                info!(row_id = %row_id, "Simulated update");
                Ok(RowUpdateResponse::Applied(MutationOutcome::simulated_write(
                    1,
                    format!("Simulated update of row {}; no data was changed", row_id),
                )))
            }
            WarehouseBackend::Connected(warehouse) => {
                let target = TableTarget::new(warehouse.project_id(), dataset_id, table_id)?;
                let integer_key = self.integer_key(warehouse.as_ref(), dataset_id, table_id).await;
                let key = key_parameter(id_column, row_id, integer_key)?;
                let statement = update_statement(&target, id_column, key, data)?;
                let result = warehouse
                    .run_query(&statement, self.settings.query_timeout)
                    .await?;
                let affected = result.affected_rows().unwrap_or(0);
                info!(row_id = %row_id, rows = affected, "Updated row");
                Ok(RowUpdateResponse::Applied(MutationOutcome::executed(
                    affected,
                    statement.sql().clone(),
                    format!("Updated {} row(s)", affected),
                )))
            }
        }
    }

    /// Delete one row by identifier.
    #[instrument(skip(self), fields(backend = self.backend.name()))]
    pub async fn delete_row(
        &self,
        dataset_id: &str,
        table_id: &str,
        row_id: &str,
    ) -> TabulaResult<MutationOutcome> {
        validate_path(dataset_id, Some(table_id))?;
        let id_column = self.settings.id_column.as_str();

        match &self.backend {
            WarehouseBackend::Unavailable => {
                key_parameter(id_column, row_id, false)?;
                info!(row_id = %row_id, "Simulated delete");
                Ok(MutationOutcome::simulated_write(
                    1,
                    format!("Simulated delete of row {}; no data was changed", row_id),
                ))
            }
            WarehouseBackend::Connected(warehouse) => {
                let target = TableTarget::new(warehouse.project_id(), dataset_id, table_id)?;
                let integer_key = self.integer_key(warehouse.as_ref(), dataset_id, table_id).await;
                let key = key_parameter(id_column, row_id, integer_key)?;
                let statement = delete_statement(&target, id_column, key)?;
                let result = warehouse
                    .run_query(&statement, self.settings.query_timeout)
                    .await?;
                let affected = result.affected_rows().unwrap_or(0);
                info!(row_id = %row_id, rows = affected, "Deleted row");
                Ok(MutationOutcome::executed(
                    affected,
                    statement.sql().clone(),
                    format!("Deleted {} row(s)", affected),
                ))
            }
        }
    }

    /// Validate or execute a batch of operations.
    ///
    /// Operations run in order and fail individually. A transactional batch
    /// stops at the first failure and reports the rest as skipped.
    #[instrument(
        skip(self, request),
        fields(backend = self.backend.name(), operations = request.operations().len())
    )]
    pub async fn bulk(
        &self,
        dataset_id: &str,
        table_id: &str,
        request: BulkRequest,
    ) -> TabulaResult<BulkResponse> {
        validate_path(dataset_id, Some(table_id))?;
        let id_column = self.settings.id_column.as_str();

        if *request.validate_only() {
            return Ok(BulkResponse::Validation(validate_bulk(
                request.operations(),
                id_column,
            )));
        }

        let integer_key = match &self.backend {
            WarehouseBackend::Connected(warehouse) => {
                self.integer_key(warehouse.as_ref(), dataset_id, table_id).await
            }
            WarehouseBackend::Unavailable => false,
        };

        let transactional = *request.transactional();
        let mut results = Vec::with_capacity(request.operations().len());
        let mut halted = false;
        for (index, op) in request.operations().iter().enumerate() {
            if halted {
                results.push(OperationResult::skipped(index, op));
                continue;
            }
            let verdict = op.validate(index, id_column);
            let outcome = if *verdict.valid() {
                self.execute_operation(dataset_id, table_id, op, integer_key)
                    .await
                    .map_err(|e| e.detail())
            } else {
                Err(verdict.errors().join("; "))
            };
            match outcome {
                Ok(affected) => results.push(OperationResult::succeeded(index, op, affected)),
                Err(message) => {
                    warn!(index, error = %message, "Bulk operation failed");
                    results.push(OperationResult::failed(index, op, message));
                    halted = transactional;
                }
            }
        }

        let report = BulkExecutionReport::new(results, transactional, !self.backend.is_connected());
        info!(
            succeeded = *report.succeeded(),
            failed = *report.failed(),
            skipped = *report.skipped(),
            "Bulk request finished"
        );
        Ok(BulkResponse::Executed(report))
    }

    async fn execute_operation(
        &self,
        dataset_id: &str,
        table_id: &str,
        op: &tabula_core::BulkOperation,
        integer_key: bool,
    ) -> TabulaResult<u64> {
        let warehouse = match &self.backend {
            WarehouseBackend::Unavailable => return Ok(1),
            WarehouseBackend::Connected(warehouse) => warehouse,
        };
        let id_column = self.settings.id_column.as_str();
        let target = TableTarget::new(warehouse.project_id(), dataset_id, table_id)?;
        let row_id = op.row_id().as_deref().unwrap_or_default();
        let empty = Row::new();

        let statement = match op.operation_type() {
            Some(OperationType::Insert) => {
                let record = op.record().cloned().unwrap_or_default();
                insert_statement(&target, &[record])?
            }
            Some(OperationType::Update) => {
                let key = key_parameter(id_column, row_id, integer_key)?;
                update_statement(&target, id_column, key, op.record().unwrap_or(&empty))?
            }
            Some(OperationType::Delete) => {
                let key = key_parameter(id_column, row_id, integer_key)?;
                delete_statement(&target, id_column, key)?
            }
            None => {
                return Err(InputError::new(InputErrorKind::InvalidRequest(format!(
                    "Unknown operation type '{}'",
                    op.op_type()
                )))
                .into());
            }
        };

        let result = warehouse
            .run_query(&statement, self.settings.query_timeout)
            .await?;
        Ok(result.affected_rows().unwrap_or(1))
    }
}
