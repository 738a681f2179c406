//! Query-string parsing for the listing, data and export endpoints.

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tabula_core::{
    DEFAULT_LIMIT, EXPORT_DEFAULT_LIMIT, ExportFormat, FilterCondition, MAX_ROW_BOUND,
    SortCondition, TableDataOptions, TableKind, TableListQuery,
};
use tabula_error::{InputError, InputErrorKind};

/// Raw query-string parameters.
pub type QueryMap = HashMap<String, String>;

fn non_blank<'a>(params: &'a QueryMap, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn number<T: std::str::FromStr>(params: &QueryMap, name: &str) -> Result<Option<T>, InputError> {
    non_blank(params, name)
        .map(|raw| {
            raw.parse::<T>().map_err(|_| {
                InputError::malformed(name, format!("'{}' is not a non-negative integer", raw))
            })
        })
        .transpose()
}

fn row_bound(params: &QueryMap, name: &str) -> Result<Option<u64>, InputError> {
    match number::<u64>(params, name)? {
        Some(value) if value > MAX_ROW_BOUND => Err(InputError::malformed(
            name,
            format!("{} exceeds the largest supported value {}", value, MAX_ROW_BOUND),
        )),
        bound => Ok(bound),
    }
}

fn json_list<T: DeserializeOwned>(params: &QueryMap, name: &str) -> Result<Vec<T>, InputError> {
    match non_blank(params, name) {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(raw).map_err(|e| InputError::malformed(name, e.to_string())),
    }
}

fn columns(params: &QueryMap) -> Option<Vec<String>> {
    non_blank(params, "columns").map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    })
}

fn options_with_limit(params: &QueryMap, default_limit: u64) -> Result<TableDataOptions, InputError> {
    let filters: Vec<FilterCondition> = json_list(params, "filters")?;
    let sorts: Vec<SortCondition> = json_list(params, "sorts")?;

    let mut builder = TableDataOptions::builder();
    builder
        .limit(row_bound(params, "limit")?.unwrap_or(default_limit))
        .offset(row_bound(params, "offset")?.unwrap_or(0))
        .filters(filters)
        .sorts(sorts);
    if let Some(search) = non_blank(params, "search") {
        builder.search(search);
    }
    if let Some(columns) = columns(params) {
        builder.columns(columns);
    }
    builder
        .build()
        .map_err(|e| InputError::new(InputErrorKind::InvalidRequest(e.to_string())))
}

/// Options for `GET .../data`.
pub fn data_options(params: &QueryMap) -> Result<TableDataOptions, InputError> {
    options_with_limit(params, DEFAULT_LIMIT)
}

/// Options and format for `GET .../export`.
pub fn export_options(params: &QueryMap) -> Result<(ExportFormat, TableDataOptions), InputError> {
    let format = ExportFormat::parse_param(non_blank(params, "format"))?;
    Ok((format, options_with_limit(params, EXPORT_DEFAULT_LIMIT)?))
}

/// Controls for `GET .../tables`.
pub fn list_query(params: &QueryMap) -> Result<TableListQuery, InputError> {
    let kind = non_blank(params, "type")
        .map(|raw| {
            raw.parse::<TableKind>()
                .map_err(|_| InputError::malformed("type", format!("unknown table type '{}'", raw)))
        })
        .transpose()?;
    Ok(TableListQuery::new(
        non_blank(params, "search").map(str::to_string),
        kind,
        number(params, "limit")?,
        number(params, "offset")?,
    ))
}
