//! Tests for filter, sort and options parsing.

use serde_json::json;
use tabula_core::{
    FilterCondition, FilterDataType, FilterOperator, SortCondition, SortDirection,
    TableDataOptions, by_priority,
};

#[test]
fn test_filter_parses_camel_case_operators() {
    let filters: Vec<FilterCondition> = serde_json::from_value(json!([
        {"column": "name", "operator": "startsWith", "value": "Ab", "dataType": "string"},
        {"column": "score", "operator": "gte", "value": 10, "dataType": "number"},
        {"column": "deleted_at", "operator": "isNull"}
    ]))
    .expect("valid filters");

    assert_eq!(filters[0].operator, FilterOperator::StartsWith);
    assert_eq!(filters[1].data_type, FilterDataType::Number);
    assert_eq!(filters[2].operator, FilterOperator::IsNull);
    assert_eq!(filters[2].data_type, FilterDataType::String);
    assert!(filters[2].value.is_null());
}

#[test]
fn test_filter_rejects_unknown_operator() {
    let parsed: Result<Vec<FilterCondition>, _> =
        serde_json::from_value(json!([{"column": "a", "operator": "like", "value": "x"}]));
    assert!(parsed.is_err());
}

#[test]
fn test_filter_echo_keeps_client_id() {
    let filter: FilterCondition = serde_json::from_value(
        json!({"id": "f1", "column": "a", "operator": "equals", "value": "x"}),
    )
    .expect("valid filter");
    let echoed = serde_json::to_value(&filter).expect("serializable");
    assert_eq!(echoed["id"], "f1");
    assert_eq!(echoed["operator"], "equals");
}

#[test]
fn test_sort_direction_accepts_any_case() {
    let sorts: Vec<SortCondition> = serde_json::from_value(json!([
        {"column": "a", "direction": "DESC"},
        {"column": "b", "direction": "ascending"},
        {"column": "c"}
    ]))
    .expect("valid sorts");
    assert_eq!(sorts[0].direction, SortDirection::Desc);
    assert_eq!(sorts[1].direction, SortDirection::Asc);
    assert_eq!(sorts[2].direction, SortDirection::Asc);
    assert_eq!(SortDirection::Desc.to_string(), "DESC");
}

#[test]
fn test_sort_direction_rejects_garbage() {
    let parsed: Result<SortCondition, _> =
        serde_json::from_value(json!({"column": "a", "direction": "sideways"}));
    assert!(parsed.is_err());
}

#[test]
fn test_by_priority_is_stable() {
    let sorts = vec![
        SortCondition::new("late", SortDirection::Asc, 2),
        SortCondition::new("first", SortDirection::Desc, 1),
        SortCondition::new("second", SortDirection::Asc, 1),
    ];
    let ordered: Vec<&str> = by_priority(&sorts)
        .iter()
        .map(|s| s.column.as_str())
        .collect();
    assert_eq!(ordered, vec!["first", "second", "late"]);
}

#[test]
fn test_options_defaults() {
    let options = TableDataOptions::default();
    assert_eq!(*options.limit(), 100);
    assert_eq!(*options.offset(), 0);
    assert!(options.search_term().is_none());
    assert!(options.projection().is_none());
}

#[test]
fn test_options_builder_and_blank_values() {
    let options = TableDataOptions::builder()
        .limit(25u64)
        .offset(50u64)
        .search("   ")
        .columns(vec![" ".to_string(), "name".to_string()])
        .build()
        .expect("valid options");
    assert_eq!(*options.limit(), 25);
    assert_eq!(*options.offset(), 50);
    assert!(options.search_term().is_none());
    assert_eq!(options.projection(), Some(vec!["name"]));
}

#[test]
fn test_clamp_limit() {
    let options = TableDataOptions::builder()
        .limit(5000u64)
        .build()
        .expect("valid options");
    assert_eq!(*options.clone().clamp_limit(Some(1000)).limit(), 1000);
    assert_eq!(*options.clone().clamp_limit(None).limit(), 5000);
    assert_eq!(*options.clamp_limit(Some(10_000)).limit(), 5000);
}
