//! Translation of table data options into parameterized GoogleSQL.
//!
//! Clause order is fixed: SELECT, FROM, WHERE (trusted clause, then filters,
//! then search), ORDER BY, LIMIT, OFFSET. Every caller-supplied value is
//! bound as a named parameter; only sanitised identifiers and parser-produced
//! integers are written into the statement text.

use crate::identifier::{TableTarget, quote_identifier};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tabula_core::{
    FilterCondition, FilterDataType, FilterOperator, MAX_ROW_BOUND, Row, TableDataOptions,
    by_priority, column_order,
};
use tabula_error::{InputError, InputErrorKind};
use tabula_interface::{ParameterValue, ParameterizedQuery};

/// Columns searched by free-text search, whether or not the table has them.
pub const SEARCH_COLUMNS: [&str; 5] = ["name", "title", "description", "player_name", "email"];

/// A filter with its value converted to typed parameters.
///
/// Shared by the SQL renderer and the in-memory fixture evaluator so both
/// reject the same inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundFilter {
    /// `=`, `>`, `>=`, `<`, `<=`
    Compare(FilterOperator, ParameterValue),
    /// `contains`, `startsWith`, `endsWith` over the raw text
    Pattern(FilterOperator, String),
    /// Inclusive range
    Between(ParameterValue, ParameterValue),
    /// Set membership; may be empty
    In(Vec<ParameterValue>),
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    NotNull,
}

/// Convert a filter value to the parameter type its declared type calls for.
pub fn typed_value(
    column: &str,
    value: &Value,
    data_type: FilterDataType,
) -> Result<ParameterValue, InputError> {
    match (data_type, value) {
        (_, Value::Null) => Err(InputError::invalid_value(column, "a value is required")),
        (_, Value::Array(_) | Value::Object(_)) => Err(InputError::invalid_value(
            column,
            "expected a scalar value",
        )),
        (FilterDataType::String, scalar) => Ok(ParameterValue::String(scalar_text(scalar))),
        (FilterDataType::Number, Value::Number(n)) => match n.as_i64() {
            Some(i) => Ok(ParameterValue::Int64(i)),
            None => n
                .as_f64()
                .map(ParameterValue::Float64)
                .ok_or_else(|| InputError::invalid_value(column, "number out of range")),
        },
        (FilterDataType::Number, Value::String(s)) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Ok(ParameterValue::Int64(i))
            } else {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(ParameterValue::Float64)
                    .ok_or_else(|| {
                        InputError::invalid_value(column, format!("'{}' is not a number", s))
                    })
            }
        }
        (FilterDataType::Boolean, Value::Bool(b)) => Ok(ParameterValue::Bool(*b)),
        (FilterDataType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str()
        {
            "true" => Ok(ParameterValue::Bool(true)),
            "false" => Ok(ParameterValue::Bool(false)),
            _ => Err(InputError::invalid_value(
                column,
                format!("'{}' is not a boolean", s),
            )),
        },
        (FilterDataType::Date, Value::String(s)) => date_value(column, s.trim()),
        (data_type, other) => Err(InputError::invalid_value(
            column,
            format!("{} is not a valid {} value", other, data_type),
        )),
    }
}

fn date_value(column: &str, s: &str) -> Result<ParameterValue, InputError> {
    if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() {
        Ok(ParameterValue::Date(s.to_string()))
    } else if DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
    {
        Ok(ParameterValue::Timestamp(s.to_string()))
    } else {
        Err(InputError::invalid_value(
            column,
            format!("'{}' is not a date or timestamp", s),
        ))
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Validate a filter and convert its value.
pub fn bind_filter(filter: &FilterCondition) -> Result<BoundFilter, InputError> {
    let column = filter.column.as_str();
    let data_type = filter.data_type;
    match filter.operator {
        FilterOperator::IsNull => Ok(BoundFilter::IsNull),
        FilterOperator::NotNull => Ok(BoundFilter::NotNull),
        op @ (FilterOperator::Contains | FilterOperator::StartsWith | FilterOperator::EndsWith) => {
            match &filter.value {
                Value::Null | Value::Array(_) | Value::Object(_) => Err(InputError::invalid_value(
                    column,
                    format!("{} expects a text value", op),
                )),
                scalar => Ok(BoundFilter::Pattern(op, scalar_text(scalar))),
            }
        }
        op @ (FilterOperator::Equals
        | FilterOperator::Gt
        | FilterOperator::Gte
        | FilterOperator::Lt
        | FilterOperator::Lte) => Ok(BoundFilter::Compare(
            op,
            typed_value(column, &filter.value, data_type)?,
        )),
        FilterOperator::Between => {
            let (from, to) = match &filter.value {
                Value::Array(items) if items.len() == 2 => (&items[0], &items[1]),
                Value::Object(range) => match (range.get("from"), range.get("to")) {
                    (Some(from), Some(to)) => (from, to),
                    _ => {
                        return Err(InputError::invalid_value(
                            column,
                            "between expects an object with 'from' and 'to'",
                        ));
                    }
                },
                _ => {
                    return Err(InputError::invalid_value(
                        column,
                        "between expects a two-element array",
                    ));
                }
            };
            Ok(BoundFilter::Between(
                typed_value(column, from, data_type)?,
                typed_value(column, to, data_type)?,
            ))
        }
        FilterOperator::In => {
            let items: Vec<Value> = match &filter.value {
                Value::Array(items) => items.clone(),
                Value::String(list) => list
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
                Value::Null => Vec::new(),
                other => vec![other.clone()],
            };
            items
                .iter()
                .map(|item| typed_value(column, item, data_type))
                .collect::<Result<Vec<_>, _>>()
                .map(BoundFilter::In)
        }
    }
}

/// Escape `%`, `_` and `\` so text matches literally inside a LIKE pattern.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn comparison_symbol(op: FilterOperator) -> &'static str {
    match op {
        FilterOperator::Gt => ">",
        FilterOperator::Gte => ">=",
        FilterOperator::Lt => "<",
        FilterOperator::Lte => "<=",
        _ => "=",
    }
}

fn filter_clause(
    filter: &FilterCondition,
    query: &mut ParameterizedQuery,
) -> Result<String, InputError> {
    let column = quote_identifier(&filter.column, "column")?;
    let clause = match bind_filter(filter)? {
        BoundFilter::IsNull => format!("{} IS NULL", column),
        BoundFilter::NotNull => format!("{} IS NOT NULL", column),
        BoundFilter::Compare(op, value) => {
            format!("{} {} {}", column, comparison_symbol(op), query.bind(value))
        }
        BoundFilter::Pattern(op, text) => {
            let escaped = escape_like(&text);
            let pattern = match op {
                FilterOperator::StartsWith => format!("{}%", escaped),
                FilterOperator::EndsWith => format!("%{}", escaped),
                _ => format!("%{}%", escaped),
            };
            format!("{} LIKE {}", column, query.bind(ParameterValue::String(pattern)))
        }
        BoundFilter::Between(from, to) => {
            let from = query.bind(from);
            let to = query.bind(to);
            format!("{} BETWEEN {} AND {}", column, from, to)
        }
        BoundFilter::In(items) if items.is_empty() => "FALSE".to_string(),
        BoundFilter::In(items) => format!(
            "{} IN UNNEST({})",
            column,
            query.bind(ParameterValue::Array(items))
        ),
    };
    Ok(clause)
}

fn search_clause(term: &str, query: &mut ParameterizedQuery) -> Result<String, InputError> {
    let placeholder = query.bind(ParameterValue::String(format!(
        "%{}%",
        escape_like(&term.to_lowercase())
    )));
    let matches = SEARCH_COLUMNS
        .iter()
        .map(|column| {
            quote_identifier(column, "search column")
                .map(|c| format!("LOWER(CAST({} AS STRING)) LIKE {}", c, placeholder))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("({})", matches.join(" OR ")))
}

/// Build the WHERE conjunction, binding values into `query`.
///
/// Returns `None` when there is nothing to filter on.
pub fn where_clause(
    options: &TableDataOptions,
    query: &mut ParameterizedQuery,
) -> Result<Option<String>, InputError> {
    let mut clauses = Vec::new();

    if let Some(custom) = options
        .where_clause()
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        clauses.push(format!("({})", custom));
    }
    for filter in options.filters() {
        clauses.push(filter_clause(filter, query)?);
    }
    if let Some(term) = options.search_term() {
        clauses.push(search_clause(term, query)?);
    }

    Ok((!clauses.is_empty()).then(|| clauses.join(" AND ")))
}

/// Build the ORDER BY list in priority order.
pub fn order_by_clause(options: &TableDataOptions) -> Result<Option<String>, InputError> {
    let keys = by_priority(options.sorts())
        .into_iter()
        .map(|sort| {
            quote_identifier(&sort.column, "sort column")
                .map(|c| format!("{} {}", c, sort.direction))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((!keys.is_empty()).then(|| keys.join(", ")))
}

fn projection(options: &TableDataOptions) -> Result<String, InputError> {
    match options.projection() {
        None => Ok("*".to_string()),
        Some(columns) => Ok(columns
            .into_iter()
            .map(|c| quote_identifier(c, "column"))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ")),
    }
}

fn row_bound(value: u64, name: &str) -> Result<u64, InputError> {
    if value > MAX_ROW_BOUND {
        return Err(InputError::malformed(
            name,
            format!("{} exceeds the largest supported value {}", value, MAX_ROW_BOUND),
        ));
    }
    Ok(value)
}

/// Data query for one page of a table.
pub fn select_query(
    target: &TableTarget,
    options: &TableDataOptions,
) -> Result<ParameterizedQuery, InputError> {
    let mut query = ParameterizedQuery::default();
    let mut sql = format!("SELECT {} FROM {}", projection(options)?, target.reference());

    if let Some(conditions) = where_clause(options, &mut query)? {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions);
    }
    if let Some(order) = order_by_clause(options)? {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order);
    }
    sql.push_str(&format!(" LIMIT {}", row_bound(*options.limit(), "limit")?));
    if *options.offset() > 0 {
        sql.push_str(&format!(" OFFSET {}", row_bound(*options.offset(), "offset")?));
    }

    Ok(query.with_sql(sql))
}

/// Count query sharing the data query's WHERE clause.
pub fn count_query(
    target: &TableTarget,
    options: &TableDataOptions,
) -> Result<ParameterizedQuery, InputError> {
    let mut query = ParameterizedQuery::default();
    let mut sql = format!("SELECT COUNT(*) AS total FROM {}", target.reference());
    if let Some(conditions) = where_clause(options, &mut query)? {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions);
    }
    Ok(query.with_sql(sql))
}

/// Unfiltered row count of a table.
pub fn table_count_query(target: &TableTarget) -> ParameterizedQuery {
    ParameterizedQuery::new(format!(
        "SELECT COUNT(*) AS total FROM {}",
        target.reference()
    ))
}

/// Parameter for a JSON value written by a DML statement. `None` means NULL.
pub fn json_parameter(value: &Value) -> Option<ParameterValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(ParameterValue::Bool(*b)),
        Value::Number(n) => Some(match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => ParameterValue::Int64(i),
            (None, Some(f)) => ParameterValue::Float64(f),
            (None, None) => ParameterValue::String(n.to_string()),
        }),
        Value::String(s) => Some(ParameterValue::String(s.clone())),
        nested => Some(ParameterValue::String(nested.to_string())),
    }
}

/// Parameter for a row identifier, typed after the identifier column.
pub fn key_parameter(
    id_column: &str,
    row_id: &str,
    integer_key: bool,
) -> Result<ParameterValue, InputError> {
    let row_id = row_id.trim();
    if row_id.is_empty() {
        return Err(InputError::new(InputErrorKind::MissingParameter(
            "rowId".to_string(),
        )));
    }
    if integer_key {
        row_id
            .parse::<i64>()
            .map(ParameterValue::Int64)
            .map_err(|_| InputError::invalid_value(id_column, format!("'{}' is not an integer", row_id)))
    } else {
        Ok(ParameterValue::String(row_id.to_string()))
    }
}

fn bind_or_null(query: &mut ParameterizedQuery, value: Option<&Value>) -> String {
    match value.and_then(json_parameter) {
        Some(param) => query.bind(param),
        None => "NULL".to_string(),
    }
}

/// `INSERT INTO ... (cols) VALUES (...), ...` over the union of record keys.
pub fn insert_statement(
    target: &TableTarget,
    records: &[Row],
) -> Result<ParameterizedQuery, InputError> {
    let columns = column_order(records);
    if columns.is_empty() {
        return Err(InputError::new(InputErrorKind::InvalidRequest(
            "nothing to insert".to_string(),
        )));
    }
    let quoted = columns
        .iter()
        .map(|c| quote_identifier(c, "column"))
        .collect::<Result<Vec<_>, _>>()?;

    let mut query = ParameterizedQuery::default();
    let mut tuples = Vec::with_capacity(records.len());
    for record in records {
        let mut values = Vec::with_capacity(columns.len());
        for column in &columns {
            values.push(bind_or_null(&mut query, record.get(column)));
        }
        tuples.push(format!("({})", values.join(", ")));
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        target.reference(),
        quoted.join(", "),
        tuples.join(", ")
    );
    Ok(query.with_sql(sql))
}

/// `UPDATE ... SET ... WHERE id = @key`.
pub fn update_statement(
    target: &TableTarget,
    id_column: &str,
    key: ParameterValue,
    data: &Row,
) -> Result<ParameterizedQuery, InputError> {
    if data.is_empty() {
        return Err(InputError::new(InputErrorKind::InvalidRequest(
            "nothing to update".to_string(),
        )));
    }
    let mut query = ParameterizedQuery::default();
    let mut assignments = Vec::with_capacity(data.len());
    for (column, value) in data {
        let quoted = quote_identifier(column, "column")?;
        assignments.push(format!("{} = {}", quoted, bind_or_null(&mut query, Some(value))));
    }
    let key_column = quote_identifier(id_column, "identifier column")?;
    let key = query.bind(key);
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        target.reference(),
        assignments.join(", "),
        key_column,
        key
    );
    Ok(query.with_sql(sql))
}

/// `DELETE FROM ... WHERE id = @key`.
pub fn delete_statement(
    target: &TableTarget,
    id_column: &str,
    key: ParameterValue,
) -> Result<ParameterizedQuery, InputError> {
    let key_column = quote_identifier(id_column, "identifier column")?;
    let mut query = ParameterizedQuery::default();
    let key = query.bind(key);
    let sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        target.reference(),
        key_column,
        key
    );
    Ok(query.with_sql(sql))
}
