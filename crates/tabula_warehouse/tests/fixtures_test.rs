//! Tests for the sample data served without a warehouse.

use serde_json::json;
use tabula_core::{
    FilterCondition, FilterOperator, SortCondition, SortDirection, TableDataOptions,
};
use tabula_warehouse::fixtures;

#[test]
fn test_seeded_catalog() {
    let ids: Vec<String> = fixtures::datasets().iter().map(|d| d.id().clone()).collect();
    assert_eq!(ids, vec!["hockey", "crm", "tournament_consolidation"]);

    let hockey = fixtures::tables("hockey");
    assert_eq!(hockey.len(), 4);
    let players = hockey
        .iter()
        .find(|t| t.id() == "players")
        .expect("players table");
    assert_eq!(*players.num_rows(), 15_420);
    assert_eq!(*players.num_bytes(), 1_542_000);

    assert!(fixtures::tables("unknown").is_empty());
}

#[test]
fn test_details_exclude_key_and_audit_columns() {
    let details = fixtures::table_details("hockey", "players", "id").expect("details");
    assert!(!details.editable_columns().contains(&"id".to_string()));
    assert!(!details.editable_columns().contains(&"created_at".to_string()));
    assert!(!details.editable_columns().contains(&"updated_at".to_string()));
    assert!(details.editable_columns().contains(&"player_name".to_string()));

    let unknown = fixtures::table_details("hockey", "mystery", "id").expect("details");
    assert_eq!(*unknown.table().num_rows(), fixtures::GENERIC_ROW_COUNT);
    assert_eq!(unknown.schema().len(), 5);

    assert!(fixtures::table_details("", "players", "id").is_err());
}

#[test]
fn test_rows_are_deterministic() {
    assert_eq!(fixtures::row("crm", "customers", 9), fixtures::row("crm", "customers", 9));
    let row = fixtures::row("crm", "customers", 9);
    assert_eq!(row.get("id"), Some(&json!(10)));
    assert_eq!(row.get("email"), Some(&json!("customer10@example.com")));

    let options = TableDataOptions::default();
    let first = fixtures::page("crm", "customers", &options).expect("page");
    let second = fixtures::page("crm", "customers", &options).expect("page");
    assert_eq!(first, second);
}

#[test]
fn test_offset_and_limit() {
    let options = TableDataOptions::builder()
        .limit(5u64)
        .offset(10u64)
        .build()
        .expect("valid options");
    let (rows, total) = fixtures::page("crm", "customers", &options).expect("page");
    assert_eq!(total, 1_000);
    let ids: Vec<_> = rows.iter().map(|r| r.get("id").cloned()).collect();
    assert_eq!(
        ids,
        vec![Some(json!(11)), Some(json!(12)), Some(json!(13)), Some(json!(14)), Some(json!(15))]
    );
}

#[test]
fn test_filters_narrow_the_total() {
    let options = TableDataOptions::builder()
        .filters(vec![FilterCondition::text("status", FilterOperator::Equals, "active")])
        .build()
        .expect("valid options");
    let (rows, total) = fixtures::page("crm", "customers", &options).expect("page");
    assert_eq!(total, 334);
    assert_eq!(rows.len(), 100);
    assert!(rows.iter().all(|r| r.get("status") == Some(&json!("active"))));

    let options = TableDataOptions::builder()
        .filters(vec![FilterCondition::text("status", FilterOperator::In, "active,prospect")])
        .build()
        .expect("valid options");
    let (_, total) = fixtures::page("crm", "customers", &options).expect("page");
    assert_eq!(total, 667);

    let options = TableDataOptions::builder()
        .filters(vec![FilterCondition::number(
            "teams",
            FilterOperator::Between,
            json!([16, 20]),
        )])
        .build()
        .expect("valid options");
    let (_, total) =
        fixtures::page("tournament_consolidation", "tournaments", &options).expect("page");
    assert_eq!(total, 200);
}

#[test]
fn test_text_filters_do_not_match_numeric_columns() {
    let options = TableDataOptions::builder()
        .filters(vec![FilterCondition::text("id", FilterOperator::Equals, "5")])
        .build()
        .expect("valid options");
    let (rows, total) = fixtures::page("crm", "customers", &options).expect("page");
    assert_eq!(total, 0);
    assert!(rows.is_empty());

    let options = TableDataOptions::builder()
        .filters(vec![FilterCondition::number("id", FilterOperator::Equals, "5")])
        .build()
        .expect("valid options");
    let (rows, total) = fixtures::page("crm", "customers", &options).expect("page");
    assert_eq!(total, 1);
    assert_eq!(rows[0].get("id"), Some(&json!(5)));
}

#[test]
fn test_search_matches_known_columns() {
    let options = TableDataOptions::builder()
        .search("CUSTOMER10@")
        .build()
        .expect("valid options");
    let (rows, total) = fixtures::page("crm", "customers", &options).expect("page");
    assert_eq!(total, 1);
    assert_eq!(rows[0].get("id"), Some(&json!(10)));
}

#[test]
fn test_sort_and_projection() {
    let options = TableDataOptions::builder()
        .limit(3u64)
        .sorts(vec![
            SortCondition::new("goals", SortDirection::Desc, 0),
            SortCondition::new("id", SortDirection::Asc, 1),
        ])
        .columns(vec!["id".to_string(), "goals".to_string()])
        .build()
        .expect("valid options");
    let (rows, _) = fixtures::page("hockey", "players", &options).expect("page");
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert_eq!(row.get("goals"), Some(&json!(59)));
        let keys: Vec<&String> = row.keys().collect();
        assert_eq!(keys, vec!["id", "goals"]);
    }
    assert!(rows[0].get("id").and_then(|v| v.as_u64()) < rows[1].get("id").and_then(|v| v.as_u64()));
}

#[test]
fn test_invalid_filters_are_rejected() {
    let options = TableDataOptions::builder()
        .filters(vec![FilterCondition::number("goals", FilterOperator::Gt, "lots")])
        .build()
        .expect("valid options");
    assert!(fixtures::page("hockey", "players", &options).is_err());
}

#[test]
fn test_query_text() {
    assert_eq!(fixtures::query_text("crm", "customers"), "Sample data for crm.customers");
}
