//! HTTP client for a running Tabula server.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tabula_core::{
    Dataset, ExportFormat, Table, TableDataOptions, TableDataResponse, TableDetails, TableKind,
};
use tabula_error::HttpError;
use tracing::{debug, error, instrument};

/// Default server address.
pub const DEFAULT_SERVER: &str = "http://localhost:3001";

/// Client for the `/api/datasets` routes.
#[derive(Debug, Clone)]
pub struct ConsoleClient {
    client: Client,
    base_url: String,
}

/// Query-string pairs for a data or export request.
pub fn options_query(options: &TableDataOptions) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("limit", options.limit().to_string()),
        ("offset", options.offset().to_string()),
    ];
    if !options.filters().is_empty() {
        query.push((
            "filters",
            serde_json::to_string(options.filters()).unwrap_or_default(),
        ));
    }
    if !options.sorts().is_empty() {
        query.push((
            "sorts",
            serde_json::to_string(options.sorts()).unwrap_or_default(),
        ));
    }
    if let Some(search) = options.search_term() {
        query.push(("search", search.to_string()));
    }
    if let Some(columns) = options.projection() {
        query.push(("columns", columns.join(",")));
    }
    query
}

/// Message from a `{error, details}` body, or the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            let summary = value.get("error").and_then(Value::as_str);
            let details = value.get("details").and_then(Value::as_str);
            match (summary, details) {
                (Some(s), Some(d)) if s != d => format!("{}: {}", s, d),
                (Some(s), _) => s.to_string(),
                _ => body.to_string(),
            }
        }
        Err(_) => body.to_string(),
    }
}

impl ConsoleClient {
    /// Creates a client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(url = %base_url, "Created console client");
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Server address.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_path(dataset_id: &str, table_id: &str) -> String {
        format!("/api/datasets/{}/tables/{}", dataset_id, table_id)
    }

    async fn send(&self, path: &str, query: &[(&str, String)]) -> Result<Response, HttpError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!(url = %url, error = ?e, "HTTP request failed");
                HttpError::new(format!("Request to {} failed: {}", url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Server error");
            return Err(HttpError::with_status(status.as_u16(), error_message(&body)));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, HttpError> {
        self.send(path, query).await?.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse response");
            HttpError::new(format!("Failed to parse JSON: {}", e))
        })
    }

    /// Datasets in the project.
    #[instrument(skip(self))]
    pub async fn datasets(&self) -> Result<Vec<Dataset>, HttpError> {
        self.get_json("/api/datasets", &[]).await
    }

    /// Tables of a dataset, optionally filtered by search text and kind.
    #[instrument(skip(self))]
    pub async fn tables(
        &self,
        dataset_id: &str,
        search: Option<&str>,
        kind: Option<TableKind>,
    ) -> Result<Vec<Table>, HttpError> {
        let mut query = Vec::new();
        if let Some(search) = search {
            query.push(("search", search.to_string()));
        }
        if let Some(kind) = kind {
            query.push(("type", kind.to_string()));
        }
        self.get_json(&format!("/api/datasets/{}/tables", dataset_id), &query)
            .await
    }

    /// Table metadata, schema and editable columns.
    #[instrument(skip(self))]
    pub async fn schema(&self, dataset_id: &str, table_id: &str) -> Result<TableDetails, HttpError> {
        self.get_json(&Self::table_path(dataset_id, table_id), &[])
            .await
    }

    /// One page of rows, normalised from whichever envelope the server sends.
    #[instrument(skip(self, options))]
    pub async fn data(
        &self,
        dataset_id: &str,
        table_id: &str,
        options: &TableDataOptions,
    ) -> Result<TableDataResponse, HttpError> {
        let path = format!("{}/data", Self::table_path(dataset_id, table_id));
        let body: Value = self.get_json(&path, &options_query(options)).await?;
        let page = TableDataResponse::from_legacy_json(&body, options);
        debug!(rows = *page.total_rows(), "Received table data");
        Ok(page)
    }

    /// Download rows as CSV or JSON text.
    #[instrument(skip(self, options))]
    pub async fn export(
        &self,
        dataset_id: &str,
        table_id: &str,
        format: ExportFormat,
        options: &TableDataOptions,
    ) -> Result<String, HttpError> {
        let path = format!("{}/export", Self::table_path(dataset_id, table_id));
        let mut query = options_query(options);
        query.push(("format", format.to_string()));
        self.send(&path, &query).await?.text().await.map_err(|e| {
            error!(error = ?e, "Failed to read export");
            HttpError::new(format!("Failed to read export: {}", e))
        })
    }
}
