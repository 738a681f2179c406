//! Tests for the console client against in-process servers.

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use tabula::{
    ConsoleClient, ExportFormat, FilterCondition, FilterOperator, ServiceSettings, SortCondition,
    SortDirection, TableDataOptions, TableKind, TableService, WarehouseBackend, create_router,
};

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{}", addr)
}

async fn fixture_client() -> ConsoleClient {
    let service = TableService::new(WarehouseBackend::Unavailable, ServiceSettings::default());
    ConsoleClient::new(spawn(create_router(service)).await)
}

#[tokio::test]
async fn test_lists_datasets_and_tables() {
    let client = fixture_client().await;

    let datasets = client.datasets().await.expect("datasets");
    let ids: Vec<&str> = datasets.iter().map(|d| d.id().as_str()).collect();
    assert_eq!(ids, vec!["hockey", "crm", "tournament_consolidation"]);

    let tables = client.tables("hockey", None, None).await.expect("tables");
    assert_eq!(tables.len(), 4);

    let drafts = client
        .tables("hockey", Some("draft"), Some(TableKind::Table))
        .await
        .expect("search");
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].id(), "all_drafts");

    let views = client
        .tables("hockey", None, Some(TableKind::View))
        .await
        .expect("views");
    assert!(views.is_empty());
}

#[tokio::test]
async fn test_schema_excludes_audit_columns_from_editing() {
    let client = fixture_client().await;
    let details = client.schema("crm", "customers").await.expect("schema");
    assert_eq!(details.table().id(), "customers");
    assert!(!details.schema().is_empty());
    assert!(!details.editable_columns().contains(&"id".to_string()));
}

#[tokio::test]
async fn test_data_round_trip_through_query_string() {
    let client = fixture_client().await;
    let options = TableDataOptions::builder()
        .limit(5u64)
        .filters(vec![FilterCondition::text(
            "status",
            FilterOperator::Equals,
            "active",
        )])
        .sorts(vec![SortCondition::new("id", SortDirection::Desc, 0)])
        .columns(vec!["id".to_string(), "status".to_string()])
        .build()
        .expect("options");

    let page = client
        .data("crm", "customers", &options)
        .await
        .expect("data");
    assert_eq!(*page.total_rows(), 5);
    assert!(*page.has_more());
    assert_eq!(*page.pagination().total(), 334);
    assert_eq!(page.filters().len(), 1);
    assert_eq!(
        Value::Object(page.data()[0].clone()),
        json!({ "id": 1000, "status": "active" })
    );
}

#[tokio::test]
async fn test_server_errors_carry_status_and_summary() {
    let client = fixture_client().await;
    let options = TableDataOptions::builder()
        .filters(vec![FilterCondition::number(
            "id",
            FilterOperator::Gt,
            "not a number",
        )])
        .build()
        .expect("options");

    let err = client
        .data("crm", "customers", &options)
        .await
        .expect_err("invalid filter");
    assert_eq!(err.status, Some(400));
    assert!(err.message.contains("id"));
}

#[tokio::test]
async fn test_export_downloads_csv_and_json() {
    let client = fixture_client().await;
    let options = TableDataOptions::builder()
        .limit(2u64)
        .columns(vec!["id".to_string(), "name".to_string()])
        .build()
        .expect("options");

    let csv = client
        .export("crm", "customers", ExportFormat::Csv, &options)
        .await
        .expect("csv");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines, vec!["id,name", "1,Customer 1", "2,Customer 2"]);

    let body = client
        .export("crm", "customers", ExportFormat::Json, &options)
        .await
        .expect("json");
    let rows: Value = serde_json::from_str(&body).expect("parse");
    assert_eq!(rows.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_unreachable_server_has_no_status() {
    let client = ConsoleClient::new("http://127.0.0.1:9/");
    assert_eq!(client.base_url(), "http://127.0.0.1:9");
    let err = client.datasets().await.expect_err("refused");
    assert!(err.status.is_none());
}

#[tokio::test]
async fn test_legacy_backend_shape_is_normalised() {
    let app = Router::new().route(
        "/api/datasets/:dataset_id/tables/:table_id/data",
        get(|| async {
            Json(json!({
                "rows": [{ "id": 1 }, { "id": 2 }],
                "totalCount": "12"
            }))
        }),
    );
    let client = ConsoleClient::new(spawn(app).await);
    let options = TableDataOptions::builder().limit(2u64).build().expect("options");

    let page = client.data("old", "table", &options).await.expect("data");
    assert_eq!(page.data().len(), 2);
    assert_eq!(*page.total_rows(), 12);
    assert!(*page.has_more());
    assert_eq!(*page.pagination().limit(), 2);
}
