//! Tests for table descriptors, schemas and listing controls.

use tabula_core::{
    FieldMode, FieldType, SchemaField, Table, TableBuilder, TableDetails, TableKind,
    TableListQuery, editable_columns,
};

fn field(name: &str, field_type: FieldType) -> SchemaField {
    SchemaField::new(name, field_type, FieldMode::Nullable)
}

fn table(id: &str, kind: TableKind, description: &str) -> Table {
    TableBuilder::default()
        .id(id)
        .name(id)
        .kind(kind)
        .description(description)
        .build()
        .expect("valid table")
}

#[test]
fn test_editable_columns_skip_id_and_audit_columns() {
    let schema = vec![
        field("id", FieldType::Integer),
        field("name", FieldType::String),
        field("created_at", FieldType::Timestamp),
        field("updated_at", FieldType::Timestamp),
        field("score", FieldType::Float),
    ];
    assert_eq!(editable_columns(&schema, "id"), vec!["name", "score"]);
}

#[test]
fn test_table_details_serialization() {
    let details = TableDetails::new(
        Table::placeholder("players"),
        vec![field("id", FieldType::Integer), field("name", FieldType::String)],
        "id",
    );
    let body = serde_json::to_value(&details).expect("serializable");
    assert_eq!(body["table"]["type"], "TABLE");
    assert_eq!(body["schema"][0]["type"], "INTEGER");
    assert_eq!(body["editableColumns"], serde_json::json!(["name"]));
}

#[test]
fn test_field_type_aliases() {
    assert_eq!(FieldType::from_warehouse("INT64"), FieldType::Integer);
    assert_eq!(FieldType::from_warehouse("bool"), FieldType::Boolean);
    assert_eq!(FieldType::from_warehouse("STRUCT"), FieldType::Record);
    assert_eq!(FieldType::from_warehouse("INTERVAL"), FieldType::String);
    assert!(FieldType::Integer.is_integer());
}

#[test]
fn test_table_kind_parsing() {
    assert_eq!(TableKind::from_warehouse("VIEW"), TableKind::View);
    assert_eq!(
        TableKind::from_warehouse("MATERIALIZED_VIEW"),
        TableKind::MaterializedView
    );
    assert_eq!(TableKind::from_warehouse("SOMETHING_NEW"), TableKind::Table);
    assert!(TableKind::View.is_view());
}

#[test]
fn test_list_query_applies_search_kind_and_paging() {
    let tables = vec![
        table("players", TableKind::Table, "Player registry"),
        table("player_view", TableKind::View, ""),
        table("drafts", TableKind::Table, "Draft picks by player"),
        table("teams", TableKind::Table, ""),
    ];

    let search = TableListQuery::new(Some("PLAYER".into()), None, None, None);
    assert_eq!(search.apply(tables.clone()).len(), 3);

    let views = TableListQuery::new(None, Some(TableKind::View), None, None);
    let found = views.apply(tables.clone());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), "player_view");

    let page = TableListQuery::new(None, None, Some(2), Some(1));
    let ids: Vec<String> = page.apply(tables).iter().map(|t| t.id().clone()).collect();
    assert_eq!(ids, vec!["player_view", "drafts"]);
}
