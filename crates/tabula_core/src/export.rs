//! Export formats, job descriptors and CSV rendering.

use crate::{FilterCondition, Row, SortCondition, TableDataOptions};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabula_error::{InputError, InputErrorKind};

/// Page size used by export downloads when none is given.
pub const EXPORT_DEFAULT_LIMIT: u64 = 10_000;

/// Download format.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    /// Comma-separated values with a header row
    #[default]
    Csv,
    /// JSON array of records
    Json,
}

impl ExportFormat {
    /// Parse a format parameter, defaulting to CSV when absent.
    pub fn parse_param(raw: Option<&str>) -> Result<Self, InputError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(Self::Csv),
            Some(raw) => raw
                .parse()
                .map_err(|_| InputError::malformed("format", format!("unsupported format '{}'", raw))),
        }
    }

    /// Content type of a download in this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

fn json_param<T: Serialize>(name: &str, value: &T) -> Result<String, InputError> {
    serde_json::to_string(value).map_err(|e| InputError::malformed(name, e.to_string()))
}

/// Body of `POST .../export`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportRequest {
    /// Requested format
    pub format: Option<String>,
    /// Filters to apply
    pub filters: Vec<FilterCondition>,
    /// Sort keys to apply
    pub sorts: Vec<SortCondition>,
    /// Search term
    pub search: Option<String>,
    /// Projection
    pub columns: Option<Vec<String>>,
}

impl ExportRequest {
    /// Parsed format.
    pub fn export_format(&self) -> Result<ExportFormat, InputError> {
        ExportFormat::parse_param(self.format.as_deref())
    }

    /// Data read options for the export.
    pub fn to_options(&self) -> TableDataOptions {
        let mut builder = TableDataOptions::builder();
        builder
            .limit(EXPORT_DEFAULT_LIMIT)
            .filters(self.filters.clone())
            .sorts(self.sorts.clone());
        if let Some(search) = &self.search {
            builder.search(search.clone());
        }
        if let Some(columns) = &self.columns {
            builder.columns(columns.clone());
        }
        builder.build().unwrap_or_default()
    }

    /// Query string for `GET .../export` that replays this request.
    ///
    /// Filters and sorts travel as JSON text; every value is percent-encoded.
    pub fn download_query(&self) -> Result<String, InputError> {
        let format = self.export_format()?;
        let mut pairs = vec![("format", format.to_string())];
        if !self.filters.is_empty() {
            pairs.push(("filters", json_param("filters", &self.filters)?));
        }
        if !self.sorts.is_empty() {
            pairs.push(("sorts", json_param("sorts", &self.sorts)?));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        if let Some(columns) = self.columns.as_ref().filter(|c| !c.is_empty()) {
            pairs.push(("columns", columns.join(",")));
        }

        Ok(pairs
            .iter()
            .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&"))
    }
}

/// Lifecycle of an export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportStatus {
    /// Accepted; the download link is usable
    Pending,
}

/// Descriptor returned when an export is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    /// Job identifier
    job_id: String,
    /// Source dataset
    dataset_id: String,
    /// Source table
    table_id: String,
    /// Download format
    format: ExportFormat,
    /// Job state
    status: ExportStatus,
    /// Synchronous download link
    download_url: String,
    /// RFC 3339 creation time
    created_at: String,
}

impl ExportJob {
    /// Describe a new export whose rows are served by the download endpoint.
    ///
    /// The download link carries the request's format, filters, sorts,
    /// search and columns.
    pub fn pending(
        job_id: impl Into<String>,
        dataset_id: &str,
        table_id: &str,
        request: &ExportRequest,
        created_at: impl Into<String>,
    ) -> Result<Self, InputError> {
        let format = request.export_format()?;
        let download_url = format!(
            "/api/datasets/{}/tables/{}/export?{}",
            urlencoding::encode(dataset_id),
            urlencoding::encode(table_id),
            request.download_query()?
        );
        Ok(Self {
            job_id: job_id.into(),
            dataset_id: dataset_id.to_string(),
            table_id: table_id.to_string(),
            format,
            status: ExportStatus::Pending,
            download_url,
            created_at: created_at.into(),
        })
    }
}

/// Column order for a set of records: keys in first-seen order.
pub fn column_order(rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

/// Render records as CSV with a header row.
///
/// Missing and null cells are empty; nested values are written as JSON text.
pub fn rows_to_csv(rows: &[Row]) -> Result<String, InputError> {
    let columns = column_order(rows);
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_error = |e: csv::Error| InputError::new(InputErrorKind::InvalidRequest(e.to_string()));

    if !columns.is_empty() {
        writer.write_record(&columns).map_err(csv_error)?;
    }
    for row in rows {
        let record: Vec<String> = columns.iter().map(|c| cell_text(row.get(c))).collect();
        writer.write_record(&record).map_err(csv_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| InputError::new(InputErrorKind::InvalidRequest(e.to_string())))?;
    String::from_utf8(bytes).map_err(|e| InputError::new(InputErrorKind::InvalidRequest(e.to_string())))
}
