//! Deterministic sample data served when no warehouse is configured.
//!
//! Rows are a pure function of the row index. Reads apply the same filter,
//! search, sort and projection semantics as the SQL path, evaluated in memory.

use crate::identifier::{quote_identifier, validate_path};
use crate::translate::{BoundFilter, SEARCH_COLUMNS, bind_filter};
use chrono::DateTime;
use serde_json::{Value, json};
use std::cmp::Ordering;
use tabula_core::{
    Dataset, DatasetBuilder, FieldMode, FieldType, FilterOperator, Row, SchemaField, SortDirection,
    Table, TableBuilder, TableDataOptions, TableDetails, by_priority,
};
use tabula_error::InputError;
use tabula_interface::ParameterValue;

const CREATED: &str = "2023-01-01";
const LAST_MODIFIED: &str = "2024-01-01";
/// 2023-01-01T00:00:00Z
const EPOCH_2023: i64 = 1_672_531_200;
/// 2000-01-01T00:00:00Z
const EPOCH_2000: i64 = 946_684_800;
const DAY: i64 = 86_400;

const POSITIONS: [&str; 3] = ["Forward", "Defense", "Goalie"];
const NATIONALITIES: [&str; 6] = ["Canada", "USA", "Sweden", "Finland", "Czechia", "Slovakia"];
const CITIES: [&str; 5] = ["Toronto", "Boston", "Minneapolis", "Calgary", "Denver"];

/// Rows in a table the catalog does not know.
pub const GENERIC_ROW_COUNT: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    AlgorithmConfig,
    Drafts,
    Commitments,
    Players,
    Customers,
    Tournaments,
    Generic,
}

struct FixtureTable {
    id: &'static str,
    description: &'static str,
    rows: u64,
    bytes: u64,
    shape: Shape,
}

struct FixtureDataset {
    id: &'static str,
    description: &'static str,
    tables: &'static [FixtureTable],
}

static CATALOG: [FixtureDataset; 3] = [
    FixtureDataset {
        id: "hockey",
        description: "Hockey analytics and statistics data",
        tables: &[
            FixtureTable {
                id: "algorithm_config",
                description: "Algorithm configuration settings",
                rows: 26,
                bytes: 2_560,
                shape: Shape::AlgorithmConfig,
            },
            FixtureTable {
                id: "all_drafts",
                description: "All draft data",
                rows: 5_892,
                bytes: 531_300,
                shape: Shape::Drafts,
            },
            FixtureTable {
                id: "college_commitments_raw",
                description: "Raw college commitment data",
                rows: 1_226,
                bytes: 89_250,
                shape: Shape::Commitments,
            },
            FixtureTable {
                id: "players",
                description: "Hockey players data",
                rows: 15_420,
                bytes: 1_542_000,
                shape: Shape::Players,
            },
        ],
    },
    FixtureDataset {
        id: "crm",
        description: "Customer relationship management data",
        tables: &[FixtureTable {
            id: "customers",
            description: "Customer data",
            rows: 1_000,
            bytes: 50_000,
            shape: Shape::Customers,
        }],
    },
    FixtureDataset {
        id: "tournament_consolidation",
        description: "Tournament and competition data",
        tables: &[FixtureTable {
            id: "tournaments",
            description: "Tournament data",
            rows: 500,
            bytes: 25_000,
            shape: Shape::Tournaments,
        }],
    },
];

fn find_dataset(dataset_id: &str) -> Option<&'static FixtureDataset> {
    CATALOG.iter().find(|d| d.id == dataset_id)
}

fn find_table(dataset_id: &str, table_id: &str) -> Option<&'static FixtureTable> {
    find_dataset(dataset_id)?.tables.iter().find(|t| t.id == table_id)
}

fn shape_and_rows(dataset_id: &str, table_id: &str) -> (Shape, u64) {
    find_table(dataset_id, table_id)
        .map(|t| (t.shape, t.rows))
        .unwrap_or((Shape::Generic, GENERIC_ROW_COUNT))
}

fn to_table(fixture: &FixtureTable) -> Table {
    TableBuilder::default()
        .id(fixture.id)
        .name(fixture.id)
        .num_rows(fixture.rows)
        .num_bytes(fixture.bytes)
        .created_time(CREATED)
        .modified_time(LAST_MODIFIED)
        .description(fixture.description)
        .build()
        .unwrap_or_else(|_| Table::placeholder(fixture.id))
}

/// The seeded datasets.
pub fn datasets() -> Vec<Dataset> {
    CATALOG
        .iter()
        .map(|d| {
            DatasetBuilder::default()
                .id(d.id)
                .name(d.id)
                .description(d.description)
                .created(Some(CREATED.to_string()))
                .last_modified(Some(LAST_MODIFIED.to_string()))
                .tables(Some(d.tables.len()))
                .build()
                .unwrap_or_else(|_| Dataset::named(d.id, d.description))
        })
        .collect()
}

/// Tables of a seeded dataset; empty for any other dataset.
pub fn tables(dataset_id: &str) -> Vec<Table> {
    find_dataset(dataset_id)
        .map(|d| d.tables.iter().map(to_table).collect())
        .unwrap_or_default()
}

fn field(name: &str, field_type: FieldType) -> SchemaField {
    SchemaField::new(name, field_type, FieldMode::Nullable)
}

fn id_field() -> SchemaField {
    SchemaField::new("id", FieldType::Integer, FieldMode::Required)
}

fn schema_for(shape: Shape) -> Vec<SchemaField> {
    let mut schema = vec![id_field()];
    let rest: Vec<SchemaField> = match shape {
        Shape::AlgorithmConfig => vec![
            field("algorithm_name", FieldType::String),
            field("version", FieldType::String),
            field("parameters", FieldType::String),
            field("created_date", FieldType::Timestamp),
            field("status", FieldType::String),
        ],
        Shape::Drafts => vec![
            field("player_name", FieldType::String),
            field("team", FieldType::String),
            field("position", FieldType::String),
            field("draft_year", FieldType::Integer),
            field("round", FieldType::Integer),
            field("pick", FieldType::Integer),
            field("points", FieldType::Integer),
        ],
        Shape::Commitments => vec![
            field("player_name", FieldType::String),
            field("college", FieldType::String),
            field("sport", FieldType::String),
            field("commitment_date", FieldType::Timestamp),
            field("position", FieldType::String),
        ],
        Shape::Players => vec![
            field("player_name", FieldType::String),
            field("position", FieldType::String),
            field("team", FieldType::String),
            field("nationality", FieldType::String),
            field("birth_date", FieldType::Date),
            field("goals", FieldType::Integer),
            field("created_at", FieldType::Timestamp),
            field("updated_at", FieldType::Timestamp),
        ],
        Shape::Customers => vec![
            field("name", FieldType::String),
            field("email", FieldType::String),
            field("company", FieldType::String),
            field("status", FieldType::String),
            field("created_at", FieldType::Timestamp),
        ],
        Shape::Tournaments => vec![
            field("name", FieldType::String),
            field("location", FieldType::String),
            field("start_date", FieldType::Date),
            field("teams", FieldType::Integer),
            field("status", FieldType::String),
        ],
        Shape::Generic => vec![
            field("name", FieldType::String),
            field("value", FieldType::Integer),
            field("category", FieldType::String),
            field("date", FieldType::Timestamp),
        ],
    };
    schema.extend(rest);
    schema
}

/// Column schema of a fixture table; unknown tables get the generic shape.
pub fn schema(dataset_id: &str, table_id: &str) -> Vec<SchemaField> {
    schema_for(shape_and_rows(dataset_id, table_id).0)
}

/// Details of a fixture table.
pub fn table_details(
    dataset_id: &str,
    table_id: &str,
    id_column: &str,
) -> Result<TableDetails, InputError> {
    validate_path(dataset_id, Some(table_id))?;
    let table = match find_table(dataset_id, table_id) {
        Some(fixture) => to_table(fixture),
        None => Table::placeholder(table_id).with_stats(GENERIC_ROW_COUNT, GENERIC_ROW_COUNT * 100),
    };
    Ok(TableDetails::new(table, schema(dataset_id, table_id), id_column))
}

fn letter(i: u64, span: u64) -> char {
    char::from(b'A' + (i % span) as u8)
}

fn timestamp(seconds: i64) -> Value {
    DateTime::from_timestamp(seconds, 0)
        .map(|t| Value::String(t.format("%Y-%m-%dT%H:%M:%SZ").to_string()))
        .unwrap_or(Value::Null)
}

fn date(seconds: i64) -> Value {
    DateTime::from_timestamp(seconds, 0)
        .map(|t| Value::String(t.format("%Y-%m-%d").to_string()))
        .unwrap_or(Value::Null)
}

fn object(value: Value) -> Row {
    match value {
        Value::Object(row) => row,
        _ => Row::new(),
    }
}

/// Row `index` (zero-based) of a fixture table.
fn row_for(shape: Shape, index: u64) -> Row {
    let i = index;
    let n = i + 1;
    let day = |offset: u64| EPOCH_2023 + (offset as i64) * DAY;
    let month_day = format!("2023-{:02}-{:02}T00:00:00Z", i % 12 + 1, i % 28 + 1);
    let position = POSITIONS[(i % 3) as usize];
    let status = ["active", "inactive", "prospect"][(i % 3) as usize];
    let schedule = ["scheduled", "completed", "cancelled"][(i % 3) as usize];
    let parameters = json!({"param1": i, "param2": letter(i, 26).to_string()}).to_string();
    let enabled = if i % 3 == 0 { "active" } else { "inactive" };

    object(match shape {
        Shape::AlgorithmConfig => json!({
            "id": n,
            "algorithm_name": format!("Algorithm_{}", n),
            "version": format!("v{}.{}", i / 10 + 1, i % 10),
            "parameters": parameters,
            "created_date": timestamp(day(i)),
            "status": enabled,
        }),
        Shape::Drafts => json!({
            "id": n,
            "player_name": format!("Player {}", n),
            "team": format!("Team {}", letter(i, 26)),
            "position": position,
            "draft_year": 2020 + i % 5,
            "round": i / 30 + 1,
            "pick": i % 30 + 1,
            "points": (i * 37 + 11) % 100,
        }),
        Shape::Commitments => json!({
            "id": n,
            "player_name": format!("Student {}", n),
            "college": format!("University {}", letter(i, 26)),
            "sport": "Hockey",
            "commitment_date": month_day,
            "position": position,
        }),
        Shape::Players => json!({
            "id": n,
            "player_name": format!("Player {}", n),
            "position": position,
            "team": format!("Team {}", letter(i, 26)),
            "nationality": NATIONALITIES[(i % 6) as usize],
            "birth_date": date(EPOCH_2000 + ((i * 17) % 3_650) as i64 * DAY),
            "goals": (i * 7) % 60,
            "created_at": timestamp(day(i % 365)),
            "updated_at": timestamp(day(i % 365 + 30)),
        }),
        Shape::Customers => json!({
            "id": n,
            "name": format!("Customer {}", n),
            "email": format!("customer{}@example.com", n),
            "company": format!("Company {}", letter(i, 26)),
            "status": status,
            "created_at": timestamp(day(i)),
        }),
        Shape::Tournaments => json!({
            "id": n,
            "name": format!("Tournament {}", n),
            "location": CITIES[(i % 5) as usize],
            "start_date": date(EPOCH_2023 + (i as i64 * 3) * DAY),
            "teams": 8 + (i % 5) * 4,
            "status": schedule,
        }),
        Shape::Generic => json!({
            "id": n,
            "name": format!("Record {}", n),
            "value": (i * 37 + 11) % 1_000,
            "category": format!("Category {}", letter(i, 5)),
            "date": month_day,
        }),
    })
}

/// Row `index` of a fixture table.
pub fn row(dataset_id: &str, table_id: &str, index: u64) -> Row {
    row_for(shape_and_rows(dataset_id, table_id).0, index)
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Order two JSON values of the same kind.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Numeric parameters also order numeric text; any other mix never matches.
fn compare_param(cell: &Value, param: &ParameterValue) -> Option<Ordering> {
    let bound = param.json_value();
    match (cell, param) {
        (Value::Null, _) => None,
        (Value::String(text), ParameterValue::Int64(_) | ParameterValue::Float64(_)) => {
            text.trim().parse::<f64>().ok()?.partial_cmp(&bound.as_f64()?)
        }
        _ => compare(cell, &bound),
    }
}

fn matches(row: &Row, column: &str, bound: &BoundFilter) -> bool {
    let cell = row.get(column).unwrap_or(&Value::Null);
    match bound {
        BoundFilter::IsNull => cell.is_null(),
        BoundFilter::NotNull => !cell.is_null(),
        BoundFilter::Pattern(op, needle) => text(cell).is_some_and(|hay| match op {
            FilterOperator::StartsWith => hay.starts_with(needle.as_str()),
            FilterOperator::EndsWith => hay.ends_with(needle.as_str()),
            _ => hay.contains(needle.as_str()),
        }),
        BoundFilter::Compare(op, param) => compare_param(cell, param).is_some_and(|ord| match op {
            FilterOperator::Gt => ord == Ordering::Greater,
            FilterOperator::Gte => ord != Ordering::Less,
            FilterOperator::Lt => ord == Ordering::Less,
            FilterOperator::Lte => ord != Ordering::Greater,
            _ => ord == Ordering::Equal,
        }),
        BoundFilter::Between(from, to) => {
            compare_param(cell, from).is_some_and(|o| o != Ordering::Less)
                && compare_param(cell, to).is_some_and(|o| o != Ordering::Greater)
        }
        BoundFilter::In(items) => items
            .iter()
            .any(|item| compare_param(cell, item) == Some(Ordering::Equal)),
    }
}

fn matches_search(row: &Row, term: &str) -> bool {
    let term = term.to_lowercase();
    SEARCH_COLUMNS.iter().any(|column| {
        row.get(*column)
            .and_then(text)
            .is_some_and(|value| value.to_lowercase().contains(&term))
    })
}

/// Nulls sort first ascending and last descending.
fn order_cells(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    let left = left.filter(|v| !v.is_null());
    let right = right.filter(|v| !v.is_null());
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare(a, b).unwrap_or_else(|| text(a).cmp(&text(b))),
    }
}

/// One page of a fixture table and the number of rows matching the filters.
pub fn page(
    dataset_id: &str,
    table_id: &str,
    options: &TableDataOptions,
) -> Result<(Vec<Row>, u64), InputError> {
    validate_path(dataset_id, Some(table_id))?;
    let (shape, count) = shape_and_rows(dataset_id, table_id);

    let filters = options
        .filters()
        .iter()
        .map(|f| {
            quote_identifier(&f.column, "column")?;
            Ok((f.column.as_str(), bind_filter(f)?))
        })
        .collect::<Result<Vec<_>, InputError>>()?;
    let sorts = by_priority(options.sorts());
    for sort in &sorts {
        quote_identifier(&sort.column, "sort column")?;
    }
    let projection = options.projection();
    if let Some(columns) = &projection {
        for column in columns {
            quote_identifier(column, "column")?;
        }
    }
    let search = options.search_term();

    let mut rows: Vec<Row> = (0..count)
        .map(|index| row_for(shape, index))
        .filter(|row| filters.iter().all(|(column, bound)| matches(row, column, bound)))
        .filter(|row| search.is_none_or(|term| matches_search(row, term)))
        .collect();
    let total = rows.len() as u64;

    if !sorts.is_empty() {
        rows.sort_by(|a, b| {
            sorts
                .iter()
                .map(|sort| {
                    let ord = order_cells(a.get(&sort.column), b.get(&sort.column));
                    match sort.direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    let page = rows
        .into_iter()
        .skip(*options.offset() as usize)
        .take(*options.limit() as usize)
        .map(|row| match &projection {
            None => row,
            Some(columns) => columns
                .iter()
                .filter_map(|c| row.get(*c).map(|v| (c.to_string(), v.clone())))
                .collect(),
        })
        .collect();

    Ok((page, total))
}

/// Query text reported for fixture reads.
pub fn query_text(dataset_id: &str, table_id: &str) -> String {
    format!("Sample data for {}.{}", dataset_id, table_id)
}
