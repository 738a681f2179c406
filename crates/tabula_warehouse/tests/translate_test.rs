//! Tests for query translation.

use serde_json::{Value, json};
use tabula_core::{
    FilterCondition, FilterDataType, FilterOperator, MAX_ROW_BOUND, Row, SortCondition,
    SortDirection, TableDataOptions,
};
use tabula_interface::ParameterValue;
use tabula_warehouse::TableTarget;
use tabula_warehouse::translate::{
    count_query, delete_statement, escape_like, insert_statement, key_parameter, select_query,
    update_statement,
};

fn target() -> TableTarget {
    TableTarget::new("proj", "hockey", "players").expect("valid target")
}

fn options_with(filters: Vec<FilterCondition>) -> TableDataOptions {
    TableDataOptions::builder()
        .filters(filters)
        .build()
        .expect("valid options")
}

#[test]
fn test_plain_select() {
    let query = select_query(&target(), &TableDataOptions::default()).expect("query");
    assert_eq!(query.sql(), "SELECT * FROM `proj.hockey.players` LIMIT 100");
    assert!(query.parameters().is_empty());
}

#[test]
fn test_row_bounds_must_fit_a_signed_integer() {
    let largest = TableDataOptions::builder()
        .limit(MAX_ROW_BOUND)
        .offset(MAX_ROW_BOUND)
        .build()
        .expect("valid options");
    let query = select_query(&target(), &largest).expect("query");
    assert!(query.sql().ends_with(&format!("LIMIT {0} OFFSET {0}", i64::MAX)));

    let too_long = TableDataOptions::builder()
        .limit(MAX_ROW_BOUND + 1)
        .build()
        .expect("valid options");
    assert!(select_query(&target(), &too_long).is_err());

    let too_far = TableDataOptions::builder()
        .offset(u64::MAX)
        .build()
        .expect("valid options");
    assert!(select_query(&target(), &too_far).is_err());
}

#[test]
fn test_clause_order_and_offset() {
    let options = TableDataOptions::builder()
        .limit(10u64)
        .offset(20u64)
        .filters(vec![FilterCondition::text("team", FilterOperator::Equals, "Team A")])
        .sorts(vec![SortCondition::new("goals", SortDirection::Desc, 0)])
        .search("smith")
        .columns(vec!["id".to_string(), "player_name".to_string()])
        .where_clause("deleted = FALSE")
        .build()
        .expect("valid options");
    let query = select_query(&target(), &options).expect("query");

    assert_eq!(
        query.sql(),
        "SELECT `id`, `player_name` FROM `proj.hockey.players` \
         WHERE (deleted = FALSE) AND `team` = @p0 AND \
         (LOWER(CAST(`name` AS STRING)) LIKE @p1 OR LOWER(CAST(`title` AS STRING)) LIKE @p1 OR \
         LOWER(CAST(`description` AS STRING)) LIKE @p1 OR LOWER(CAST(`player_name` AS STRING)) LIKE @p1 OR \
         LOWER(CAST(`email` AS STRING)) LIKE @p1) \
         ORDER BY `goals` DESC LIMIT 10 OFFSET 20"
    );
    assert_eq!(query.parameter("p0"), Some(&ParameterValue::String("Team A".into())));
    assert_eq!(query.parameter("p1"), Some(&ParameterValue::String("%smith%".into())));
}

#[test]
fn test_equals_typed_by_declared_type() {
    let options = options_with(vec![
        FilterCondition::text("jersey", FilterOperator::Equals, "12"),
        FilterCondition::number("goals", FilterOperator::Equals, 12),
        FilterCondition::new("active", FilterOperator::Equals, "true", FilterDataType::Boolean),
        FilterCondition::new("born", FilterOperator::Equals, "2001-02-03", FilterDataType::Date),
    ]);
    let query = select_query(&target(), &options).expect("query");
    assert_eq!(query.parameter("p0"), Some(&ParameterValue::String("12".into())));
    assert_eq!(query.parameter("p1"), Some(&ParameterValue::Int64(12)));
    assert_eq!(query.parameter("p2"), Some(&ParameterValue::Bool(true)));
    assert_eq!(query.parameter("p3"), Some(&ParameterValue::Date("2001-02-03".into())));
}

#[test]
fn test_filters_join_in_input_order() {
    let options = options_with(vec![
        FilterCondition::number("b", FilterOperator::Gt, 1),
        FilterCondition::number("a", FilterOperator::Lte, 2.5),
        FilterCondition::text("c", FilterOperator::IsNull, ""),
    ]);
    let query = select_query(&target(), &options).expect("query");
    assert!(
        query
            .sql()
            .contains("WHERE `b` > @p0 AND `a` <= @p1 AND `c` IS NULL LIMIT")
    );
    assert_eq!(query.parameter("p1"), Some(&ParameterValue::Float64(2.5)));
}

#[test]
fn test_like_patterns_are_escaped() {
    assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    let options = options_with(vec![
        FilterCondition::text("name", FilterOperator::StartsWith, "a_b"),
        FilterCondition::text("name", FilterOperator::EndsWith, "z"),
        FilterCondition::text("name", FilterOperator::Contains, "100%"),
    ]);
    let query = select_query(&target(), &options).expect("query");
    assert_eq!(query.parameter("p0"), Some(&ParameterValue::String("a\\_b%".into())));
    assert_eq!(query.parameter("p1"), Some(&ParameterValue::String("%z".into())));
    assert_eq!(query.parameter("p2"), Some(&ParameterValue::String("%100\\%%".into())));
}

#[test]
fn test_between_and_in() {
    let options = options_with(vec![
        FilterCondition::number("goals", FilterOperator::Between, json!([10, 20])),
        FilterCondition::new(
            "born",
            FilterOperator::Between,
            json!({"from": "2000-01-01", "to": "2001-01-01"}),
            FilterDataType::Date,
        ),
        FilterCondition::text("team", FilterOperator::In, "A, B,,C"),
        FilterCondition::number("id", FilterOperator::In, json!([])),
    ]);
    let query = select_query(&target(), &options).expect("query");
    assert!(query.sql().contains("`goals` BETWEEN @p0 AND @p1"));
    assert!(query.sql().contains("`born` BETWEEN @p2 AND @p3"));
    assert!(query.sql().contains("`team` IN UNNEST(@p4)"));
    assert!(query.sql().contains("AND FALSE LIMIT"));
    assert_eq!(
        query.parameter("p4"),
        Some(&ParameterValue::Array(vec![
            ParameterValue::String("A".into()),
            ParameterValue::String("B".into()),
            ParameterValue::String("C".into()),
        ]))
    );
}

#[test]
fn test_invalid_values_are_rejected() {
    let bad = [
        FilterCondition::number("goals", FilterOperator::Gt, "many"),
        FilterCondition::new("d", FilterOperator::Lt, "yesterday", FilterDataType::Date),
        FilterCondition::number("goals", FilterOperator::Between, json!([1])),
        FilterCondition::new("name", FilterOperator::Equals, Value::Null, FilterDataType::String),
    ];
    for filter in bad {
        assert!(select_query(&target(), &options_with(vec![filter])).is_err());
    }
}

#[test]
fn test_identifiers_are_sanitized() {
    let options = options_with(vec![FilterCondition::text(
        "we`ird",
        FilterOperator::Equals,
        "x",
    )]);
    let query = select_query(&target(), &options).expect("query");
    assert!(query.sql().contains("`we\\`ird` = @p0"));

    assert!(TableTarget::new("proj", "", "t").is_err());
    assert!(TableTarget::new("proj", "d", "bad\nname").is_err());
    let options = options_with(vec![FilterCondition::text("", FilterOperator::Equals, "x")]);
    assert!(select_query(&target(), &options).is_err());
}

#[test]
fn test_sorts_follow_priority() {
    let options = TableDataOptions::builder()
        .sorts(vec![
            SortCondition::new("c", SortDirection::Asc, 3),
            SortCondition::new("a", SortDirection::Desc, 1),
            SortCondition::new("b", SortDirection::Asc, 1),
        ])
        .build()
        .expect("valid options");
    let query = select_query(&target(), &options).expect("query");
    assert!(query.sql().contains("ORDER BY `a` DESC, `b` ASC, `c` ASC LIMIT"));
}

#[test]
fn test_count_query_shares_where_clause() {
    let options = TableDataOptions::builder()
        .limit(5u64)
        .offset(5u64)
        .filters(vec![FilterCondition::number("goals", FilterOperator::Gte, 3)])
        .search("x")
        .build()
        .expect("valid options");
    let count = count_query(&target(), &options).expect("query");
    assert!(
        count
            .sql()
            .starts_with("SELECT COUNT(*) AS total FROM `proj.hockey.players` WHERE `goals` >= @p0 AND (")
    );
    assert!(!count.sql().contains("LIMIT"));
    assert_eq!(count.parameters().len(), 2);
}

#[test]
fn test_dml_statements_bind_values() {
    let mut first = Row::new();
    first.insert("name".into(), json!("Ann"));
    first.insert("goals".into(), json!(3));
    let mut second = Row::new();
    second.insert("name".into(), json!("Bo"));
    second.insert("tags".into(), json!(["x"]));

    let insert = insert_statement(&target(), &[first.clone(), second]).expect("insert");
    assert_eq!(
        insert.sql(),
        "INSERT INTO `proj.hockey.players` (`name`, `goals`, `tags`) VALUES (@p0, @p1, NULL), (@p2, NULL, @p3)"
    );
    assert_eq!(insert.parameter("p3"), Some(&ParameterValue::String("[\"x\"]".into())));

    let key = key_parameter("id", "42", true).expect("key");
    let update = update_statement(&target(), "id", key, &first).expect("update");
    assert_eq!(
        update.sql(),
        "UPDATE `proj.hockey.players` SET `name` = @p0, `goals` = @p1 WHERE `id` = @p2"
    );
    assert_eq!(update.parameter("p2"), Some(&ParameterValue::Int64(42)));

    let key = key_parameter("id", "abc", false).expect("key");
    let delete = delete_statement(&target(), "id", key).expect("delete");
    assert_eq!(delete.sql(), "DELETE FROM `proj.hockey.players` WHERE `id` = @p0");

    assert!(key_parameter("id", "abc", true).is_err());
    assert!(key_parameter("id", " ", false).is_err());
    assert!(insert_statement(&target(), &[]).is_err());
}
