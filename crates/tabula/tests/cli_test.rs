//! Tests for command-line parsing.

use clap::Parser;
use serde_json::json;
use tabula::{
    Cli, Commands, ExportFormat, FilterDataType, FilterOperator, SortDirection, TableKind,
    parse_filter, parse_sort,
};

#[test]
fn test_parse_filter_with_type_suffix() {
    let filter = parse_filter("goals:gte:20:number").expect("filter");
    assert_eq!(filter.column, "goals");
    assert_eq!(filter.operator, FilterOperator::Gte);
    assert_eq!(filter.value, json!(20));
    assert_eq!(filter.data_type, FilterDataType::Number);
}

#[test]
fn test_parse_filter_keeps_colons_in_value() {
    let filter = parse_filter("created_at:gt:2024-01-01T10:00:00").expect("filter");
    assert_eq!(filter.value, json!("2024-01-01T10:00:00"));
    assert_eq!(filter.data_type, FilterDataType::String);
}

#[test]
fn test_parse_filter_lists() {
    let filter = parse_filter("status:in:active,prospect").expect("in");
    assert_eq!(filter.value, json!(["active", "prospect"]));

    let filter = parse_filter("teams:between:16,20:number").expect("between");
    assert_eq!(filter.value, json!([16, 20]));
}

#[test]
fn test_parse_filter_rejects_bad_input() {
    assert!(parse_filter("status").is_err());
    assert!(parse_filter("status:resembles:x").is_err());
}

#[test]
fn test_parse_sort_defaults() {
    let sort = parse_sort("name", 3).expect("sort");
    assert_eq!(sort.direction, SortDirection::Asc);
    assert_eq!(sort.priority, 3);

    let sort = parse_sort("goals:DESC:0", 3).expect("sort");
    assert_eq!(sort.direction, SortDirection::Desc);
    assert_eq!(sort.priority, 0);

    assert!(parse_sort("goals:sideways", 0).is_err());
    assert!(parse_sort(":asc", 0).is_err());
}

#[test]
fn test_data_command_builds_options() {
    let cli = Cli::try_parse_from([
        "tabula",
        "--server",
        "http://example.test:3001",
        "data",
        "hockey",
        "players",
        "--limit",
        "10",
        "--filter",
        "position:equals:C",
        "--sort",
        "goals:desc",
        "--sort",
        "id",
        "--columns",
        "id,goals",
        "--format",
        "csv",
    ])
    .expect("parse");
    assert_eq!(cli.server, "http://example.test:3001");

    let Commands::Data { rows, limit } = cli.command else {
        panic!("expected data command");
    };
    assert_eq!(rows.format, ExportFormat::Csv);
    let options = rows.options(limit).expect("options");
    assert_eq!(*options.limit(), 10);
    assert_eq!(options.filters().len(), 1);
    assert_eq!(options.sorts()[1].priority, 1);
    assert_eq!(options.projection(), Some(vec!["id", "goals"]));
}

#[test]
fn test_tables_command_parses_kind() {
    let cli = Cli::try_parse_from(["tabula", "tables", "hockey", "--type", "view"]).expect("parse");
    match cli.command {
        Commands::Tables { dataset, kind, .. } => {
            assert_eq!(dataset, "hockey");
            assert_eq!(kind, Some(TableKind::View));
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_malformed_filter_is_a_usage_error() {
    let result = Cli::try_parse_from(["tabula", "data", "crm", "customers", "--filter", "oops"]);
    assert!(result.is_err());
}
