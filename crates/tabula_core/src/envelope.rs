//! Canonical response envelope for table data reads.

use crate::{FilterCondition, Row, SortCondition, TableDataOptions};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Pagination echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Pagination {
    /// Requested page size
    limit: u64,
    /// Requested offset
    offset: u64,
    /// Total matching rows, or the returned row count when no count is available
    total: u64,
}

impl Pagination {
    /// Create a pagination echo.
    pub fn new(limit: u64, offset: u64, total: u64) -> Self {
        Self {
            limit,
            offset,
            total,
        }
    }
}

/// The one shape returned for every table data read, whichever backend
/// served it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct TableDataResponse {
    /// Column-keyed records
    data: Vec<Row>,
    /// Number of records in `data`
    total_rows: u64,
    /// True when a full page came back
    has_more: bool,
    /// Applied pagination and the best-known total
    pagination: Pagination,
    /// Applied filters
    #[serde(default)]
    filters: Vec<FilterCondition>,
    /// Applied sort keys
    #[serde(default)]
    sorts: Vec<SortCondition>,
    /// Applied search term
    #[serde(default, skip_serializing_if = "Option::is_none")]
    search: Option<String>,
    /// Query text that was issued
    query: String,
    /// Wall-clock duration in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    execution_time: Option<u64>,
}

/// Whether more rows may follow a page.
///
/// A page is considered full when it holds exactly `limit` rows. This reports
/// more-available when the total is an exact multiple of the limit; a zero
/// limit never has more.
pub fn has_more(returned: u64, limit: u64) -> bool {
    limit > 0 && returned == limit
}

impl TableDataResponse {
    /// Assemble an envelope from the rows of a read.
    ///
    /// `total_count` is the result of the count query; when it is absent the
    /// returned row count stands in for the total.
    pub fn assemble(
        data: Vec<Row>,
        options: &TableDataOptions,
        total_count: Option<u64>,
        query: impl Into<String>,
        elapsed: Option<Duration>,
    ) -> Self {
        let returned = data.len() as u64;
        Self {
            total_rows: returned,
            has_more: has_more(returned, *options.limit()),
            pagination: Pagination::new(
                *options.limit(),
                *options.offset(),
                total_count.unwrap_or(returned),
            ),
            filters: options.filters().clone(),
            sorts: options.sorts().clone(),
            search: options.search_term().map(str::to_string),
            query: query.into(),
            execution_time: elapsed.map(|d| d.as_millis() as u64),
            data,
        }
    }

    /// Take ownership of the records.
    pub fn into_data(self) -> Vec<Row> {
        self.data
    }

    /// Normalize a response body from any historical backend version.
    ///
    /// The row payload is read from `data`, then `rows`; the total from
    /// `totalRows`, then `totalCount` (numbers or numeric strings). Missing
    /// fields default to an empty payload and zero. Pagination comes from the
    /// body when present, otherwise from `requested`.
    pub fn from_legacy_json(body: &Value, requested: &TableDataOptions) -> Self {
        let data: Vec<Row> = ["data", "rows"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_array))
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row.as_object().cloned())
                    .collect()
            })
            .unwrap_or_default();

        let total = ["totalRows", "totalCount"]
            .iter()
            .find_map(|key| body.get(*key).and_then(count_value))
            .unwrap_or(0);

        let pagination = body.get("pagination");
        let limit = pagination
            .and_then(|p| p.get("limit"))
            .and_then(count_value)
            .unwrap_or(*requested.limit());
        let offset = pagination
            .and_then(|p| p.get("offset"))
            .and_then(count_value)
            .unwrap_or(*requested.offset());
        let pagination_total = pagination
            .and_then(|p| p.get("total"))
            .and_then(count_value)
            .unwrap_or(total);

        let filters = body
            .get("filters")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_else(|| requested.filters().clone());
        let sorts = body
            .get("sorts")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_else(|| requested.sorts().clone());

        let returned = data.len() as u64;
        Self {
            total_rows: total,
            has_more: has_more(returned, limit),
            pagination: Pagination::new(limit, offset, pagination_total),
            filters,
            sorts,
            search: body
                .get("search")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| requested.search_term().map(str::to_string)),
            query: body
                .get("query")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            execution_time: body.get("executionTime").and_then(count_value),
            data,
        }
    }
}

fn count_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
