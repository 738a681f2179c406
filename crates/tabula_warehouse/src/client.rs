//! BigQuery access through `gcp-bigquery-client`.

use crate::auth::service_account_key;
use crate::rows::{FieldSpec, decode_rows, field_specs, millis_to_rfc3339, schema_fields};
use async_trait::async_trait;
use futures::future::join_all;
use gcp_bigquery_client::Client;
use gcp_bigquery_client::client_builder::ClientBuilder;
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::get_query_results_parameters::GetQueryResultsParameters;
use gcp_bigquery_client::model::query_request::QueryRequest;
use gcp_bigquery_client::model::query_response::QueryResponse;
use gcp_bigquery_client::{dataset, table};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tabula_core::{Dataset, DatasetBuilder, Table, TableBuilder, TableKind};
use tabula_error::{ConfigError, WarehouseError, WarehouseErrorKind, WarehouseResult};
use tabula_interface::{
    ParameterValue, ParameterizedQuery, QueryRows, TableMetadata, TableRef, Warehouse,
};
use tracing::{debug, error, instrument, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Longest a single `jobs.query` / `getQueryResults` call is asked to wait.
const MAX_SERVER_WAIT: Duration = Duration::from_secs(10);
/// Deadline for metadata calls.
const METADATA_TIMEOUT: Duration = Duration::from_secs(30);

/// BigQuery warehouse for one project.
pub struct BigQueryClient {
    client: Client,
    project_id: String,
    location: Option<String>,
}

impl std::fmt::Debug for BigQueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigQueryClient")
            .field("project_id", &self.project_id)
            .field("location", &self.location)
            .finish()
    }
}

fn warehouse_error(kind: WarehouseErrorKind) -> WarehouseError {
    WarehouseError::new(kind)
}

fn serialization_error(message: impl std::fmt::Display) -> WarehouseError {
    warehouse_error(WarehouseErrorKind::Serialization(message.to_string()))
}

/// Classify a client failure.
///
/// API responses are classified by HTTP status, transport failures by
/// whether they timed out, and credential failures as authentication errors.
pub fn classify_error(err: BQError) -> WarehouseError {
    let kind = match err {
        BQError::ResponseError { error } => {
            let code = error.error.code;
            let message = error.error.message.clone();
            match code {
                404 => WarehouseErrorKind::NotFound(message),
                401 => WarehouseErrorKind::Authentication(message),
                403 => WarehouseErrorKind::PermissionDenied(message),
                408 | 504 => WarehouseErrorKind::Timeout(message),
                _ => WarehouseErrorKind::Query(format!("{} (HTTP {})", message, code)),
            }
        }
        BQError::RequestError(e) if e.is_timeout() => WarehouseErrorKind::Timeout(e.to_string()),
        BQError::RequestError(e) => WarehouseErrorKind::Connection(e.to_string()),
        BQError::SerializationError(e) => WarehouseErrorKind::Serialization(e.to_string()),
        e @ (BQError::AuthError(_)
        | BQError::YupAuthError(_)
        | BQError::NoToken
        | BQError::InvalidServiceAccountKey(_)
        | BQError::InvalidServiceAccountAuthenticator(_)) => {
            WarehouseErrorKind::Authentication(e.to_string())
        }
        other => WarehouseErrorKind::Query(other.to_string()),
    };
    warehouse_error(kind)
}

fn parameter_type(value: &ParameterValue) -> Value {
    match value.element_type() {
        Some(element) => json!({ "type": value.type_name(), "arrayType": { "type": element } }),
        None => json!({ "type": value.type_name() }),
    }
}

fn parameter_value(value: &ParameterValue) -> Value {
    match value {
        ParameterValue::Array(items) => {
            json!({ "arrayValues": items.iter().map(parameter_value).collect::<Vec<_>>() })
        }
        scalar => json!({ "value": scalar.wire_value() }),
    }
}

/// Fill a client model from its REST field names.
fn model<T: DeserializeOwned>(fields: Value) -> WarehouseResult<T> {
    serde_json::from_value(fields).map_err(serialization_error)
}

/// `jobs.query` request for a parameterized statement.
///
/// GoogleSQL only; parameters are bound by name and the call waits at most
/// `timeout` (capped per call) for completion.
pub fn query_request(
    query: &ParameterizedQuery,
    timeout: Duration,
    location: Option<&str>,
) -> WarehouseResult<QueryRequest> {
    let mut fields = json!({
        "query": query.sql(),
        "useLegacySql": false,
        "timeoutMs": timeout.min(MAX_SERVER_WAIT).as_millis() as u64,
    });
    if !query.parameters().is_empty() {
        fields["parameterMode"] = json!("NAMED");
        fields["queryParameters"] = query
            .parameters()
            .iter()
            .map(|p| {
                json!({
                    "name": p.name(),
                    "parameterType": parameter_type(p.value()),
                    "parameterValue": parameter_value(p.value()),
                })
            })
            .collect();
    }
    if let Some(location) = location {
        fields["location"] = json!(location);
    }
    model(fields)
}

/// Read-only view of an API resource through its REST field names.
struct Resource(Value);

impl Resource {
    fn of<T: Serialize>(resource: &T) -> WarehouseResult<Self> {
        serde_json::to_value(resource)
            .map(Self)
            .map_err(serialization_error)
    }

    fn text(&self, pointer: &str) -> Option<String> {
        match self.0.pointer(pointer)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn count(&self, pointer: &str) -> Option<u64> {
        self.text(pointer)?.trim().parse().ok()
    }

    fn timestamp(&self, pointer: &str) -> Option<String> {
        self.text(pointer).as_deref().and_then(millis_to_rfc3339)
    }

    fn items(&self, pointer: &str) -> Vec<Resource> {
        self.0
            .pointer(pointer)
            .and_then(Value::as_array)
            .map(|items| items.iter().cloned().map(Resource).collect())
            .unwrap_or_default()
    }

    fn labels(&self) -> BTreeMap<String, String> {
        self.0
            .pointer("/labels")
            .and_then(Value::as_object)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn parse_count(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse().ok())
}

async fn within<T>(
    deadline: Duration,
    what: &str,
    call: impl std::future::Future<Output = Result<T, BQError>>,
) -> WarehouseResult<T> {
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            error!(error = %e, call = what, "BigQuery request failed");
            Err(classify_error(e))
        }
        Err(_) => Err(warehouse_error(WarehouseErrorKind::Timeout(format!(
            "{} did not complete within {} ms",
            what,
            deadline.as_millis()
        )))),
    }
}

impl BigQueryClient {
    /// Wrap a connected client for `project_id`.
    pub fn new(project_id: impl Into<String>, location: Option<String>, client: Client) -> Self {
        Self {
            client,
            project_id: project_id.into(),
            location,
        }
    }

    /// Build a client from service account credentials (raw or base64 JSON).
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials cannot be decoded or the
    /// authenticator cannot be built.
    #[instrument(skip(credentials), fields(project_id = %project_id))]
    pub async fn connect(
        project_id: &str,
        credentials: &str,
        location: Option<String>,
    ) -> Result<Self, ConfigError> {
        let key = service_account_key(credentials)?;
        let client_email = key.client_email.clone();
        let client = ClientBuilder::new()
            .build_from_service_account_key(key, false)
            .await
            .map_err(|e| ConfigError::new(format!("Failed to build BigQuery client: {}", e)))?;
        debug!(client_email = %client_email, "BigQuery client initialized");
        Ok(Self::new(project_id, location, client))
    }

    /// Processing location sent with queries.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    async fn query_results(
        &self,
        job_id: &str,
        location: Option<&str>,
        page_token: Option<String>,
        deadline: Instant,
    ) -> WarehouseResult<QueryResponse> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let mut fields = json!({ "timeoutMs": remaining.min(MAX_SERVER_WAIT).as_millis() as u64 });
        if let Some(location) = location {
            fields["location"] = json!(location);
        }
        if let Some(token) = page_token {
            fields["pageToken"] = json!(token);
        }
        let parameters: GetQueryResultsParameters = model(fields)?;
        let page = within(
            remaining,
            "getQueryResults",
            self.client
                .job()
                .get_query_results(&self.project_id, job_id, parameters),
        )
        .await?;
        // A results page carries the `jobs.query` response fields.
        model(serde_json::to_value(&page).map_err(serialization_error)?)
    }

    async fn collect_rows(
        &self,
        query: &ParameterizedQuery,
        started: Instant,
        timeout: Duration,
    ) -> WarehouseResult<QueryRows> {
        let deadline = started + timeout;
        let request = query_request(query, timeout, self.location.as_deref())?;
        debug!(sql = %query.sql(), "Submitting query");
        let mut response = within(
            timeout,
            "jobs.query",
            self.client.job().query(&self.project_id, request),
        )
        .await?;

        let job = Resource::of(&response.job_reference)?;
        let job_id = job.text("/jobId");
        let location = job.text("/location").or_else(|| self.location.clone());

        while !response.job_complete.unwrap_or(false) {
            let Some(job_id) = job_id.as_deref() else {
                return Err(warehouse_error(WarehouseErrorKind::Query(
                    "Incomplete query response without a job reference".to_string(),
                )));
            };
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(job_id = %job_id, "Query exceeded its deadline");
                return Err(warehouse_error(WarehouseErrorKind::Timeout(format!(
                    "Query did not complete within {} ms",
                    timeout.as_millis()
                ))));
            }
            tokio::time::sleep(POLL_INTERVAL.min(remaining)).await;
            response = self
                .query_results(job_id, location.as_deref(), None, deadline)
                .await?;
        }

        let specs: Vec<FieldSpec> = field_specs(&response.schema)?;
        let affected_rows = parse_count(response.num_dml_affected_rows.as_deref());
        let total_rows = parse_count(response.total_rows.as_deref());
        let mut page_token = response.page_token.clone();
        let mut rows = decode_rows(response, &specs)?;

        while let Some(token) = page_token.take() {
            let Some(job_id) = job_id.as_deref() else {
                break;
            };
            let page = self
                .query_results(job_id, location.as_deref(), Some(token), deadline)
                .await?;
            page_token = page.page_token.clone();
            rows.extend(decode_rows(page, &specs)?);
        }

        debug!(
            job_id = ?job_id,
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query complete"
        );

        let mut result = QueryRows::new(rows).with_affected_rows(affected_rows);
        if total_rows.is_some() {
            result = result.with_total_rows(total_rows);
        }
        if let Some(job_id) = job_id {
            result = result.with_job_id(job_id);
        }
        Ok(result)
    }

    async fn dataset(&self, entry: &Resource) -> WarehouseResult<Dataset> {
        let id = entry.text("/datasetReference/datasetId").unwrap_or_default();
        let resource = within(
            METADATA_TIMEOUT,
            "datasets.get",
            self.client.dataset().get(&self.project_id, &id),
        )
        .await?;
        let resource = Resource::of(&resource)?;
        DatasetBuilder::default()
            .id(id.clone())
            .name(resource.text("/friendlyName").unwrap_or_else(|| id.clone()))
            .description(resource.text("/description").unwrap_or_default())
            .location(resource.text("/location").unwrap_or_else(|| "US".to_string()))
            .created(resource.timestamp("/creationTime"))
            .last_modified(resource.timestamp("/lastModifiedTime"))
            .build()
            .map_err(serialization_error)
    }

    fn listed_dataset(entry: &Resource) -> Dataset {
        let id = entry.text("/datasetReference/datasetId").unwrap_or_default();
        let fallback = Dataset::named(id.clone(), "");
        DatasetBuilder::default()
            .id(id.clone())
            .name(entry.text("/friendlyName").unwrap_or_else(|| id.clone()))
            .location(entry.text("/location").unwrap_or_else(|| "US".to_string()))
            .build()
            .unwrap_or(fallback)
    }

    fn table_from_resource(&self, table_id: &str, resource: &Resource) -> Table {
        let kind = resource.text("/type").unwrap_or_else(|| "TABLE".to_string());
        TableBuilder::default()
            .id(table_id)
            .name(resource.text("/friendlyName").unwrap_or_else(|| table_id.to_string()))
            .kind(TableKind::from_warehouse(&kind))
            .num_rows(resource.count("/numRows").unwrap_or(0))
            .num_bytes(resource.count("/numBytes").unwrap_or(0))
            .created_time(resource.timestamp("/creationTime").unwrap_or_default())
            .modified_time(resource.timestamp("/lastModifiedTime").unwrap_or_default())
            .description(resource.text("/description").unwrap_or_default())
            .labels(resource.labels())
            .location(
                resource
                    .text("/location")
                    .or_else(|| self.location.clone())
                    .unwrap_or_else(|| "US".to_string()),
            )
            .build()
            .unwrap_or_else(|_| Table::placeholder(table_id))
    }
}

#[async_trait]
impl Warehouse for BigQueryClient {
    fn project_id(&self) -> &str {
        &self.project_id
    }

    #[instrument(skip(self), fields(project_id = %self.project_id))]
    async fn list_datasets(&self) -> WarehouseResult<Vec<Dataset>> {
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let options = match page_token.take() {
                Some(token) => dataset::ListOptions::default().page_token(token),
                None => dataset::ListOptions::default(),
            };
            let page = within(
                METADATA_TIMEOUT,
                "datasets.list",
                self.client.dataset().list(&self.project_id, options),
            )
            .await?;
            let page = Resource::of(&page)?;
            entries.extend(page.items("/datasets"));
            match page.text("/nextPageToken") {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        let details = join_all(entries.iter().map(|entry| self.dataset(entry))).await;
        let datasets = entries
            .iter()
            .zip(details)
            .map(|(entry, detail)| match detail {
                Ok(dataset) => dataset,
                Err(e) => {
                    let listed = Self::listed_dataset(entry);
                    warn!(dataset_id = %listed.id(), error = %e, "Dataset metadata unavailable");
                    listed
                }
            })
            .collect::<Vec<_>>();

        debug!(count = datasets.len(), "Listed datasets");
        Ok(datasets)
    }

    #[instrument(skip(self), fields(project_id = %self.project_id))]
    async fn list_tables(&self, dataset_id: &str) -> WarehouseResult<Vec<TableRef>> {
        let mut tables = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let options = match page_token.take() {
                Some(token) => table::ListOptions::default().page_token(token),
                None => table::ListOptions::default(),
            };
            let page = within(
                METADATA_TIMEOUT,
                "tables.list",
                self.client.table().list(&self.project_id, dataset_id, options),
            )
            .await?;
            let page = Resource::of(&page)?;
            tables.extend(page.items("/tables").iter().filter_map(|entry| {
                let table_id = entry.text("/tableReference/tableId")?;
                let kind = entry.text("/type").unwrap_or_else(|| "TABLE".to_string());
                Some(TableRef::new(table_id, TableKind::from_warehouse(&kind)))
            }));
            match page.text("/nextPageToken") {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        debug!(count = tables.len(), "Listed tables");
        Ok(tables)
    }

    #[instrument(skip(self), fields(project_id = %self.project_id))]
    async fn table_metadata(
        &self,
        dataset_id: &str,
        table_id: &str,
    ) -> WarehouseResult<TableMetadata> {
        let resource = within(
            METADATA_TIMEOUT,
            "tables.get",
            self.client
                .table()
                .get(&self.project_id, dataset_id, table_id, None),
        )
        .await?;
        let resource = Resource::of(&resource)?;
        let schema = match resource.0.get("schema") {
            Some(schema) => schema_fields(&field_specs(schema)?),
            None => Vec::new(),
        };
        let bytes_reported = resource.count("/numBytes").is_some();
        let table = self.table_from_resource(table_id, &resource);
        Ok(TableMetadata::new(table, schema, bytes_reported))
    }

    #[instrument(skip(self, query), fields(project_id = %self.project_id, params = query.parameters().len()))]
    async fn run_query(
        &self,
        query: &ParameterizedQuery,
        timeout: Duration,
    ) -> WarehouseResult<QueryRows> {
        let started = Instant::now();
        match tokio::time::timeout(timeout, self.collect_rows(query, started, timeout)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Query exceeded its deadline");
                Err(warehouse_error(WarehouseErrorKind::Timeout(format!(
                    "Query did not complete within {} ms",
                    timeout.as_millis()
                ))))
            }
        }
    }
}
