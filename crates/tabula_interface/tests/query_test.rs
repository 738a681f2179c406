//! Tests for parameterized query types.

use serde_json::json;
use tabula_core::Row;
use tabula_interface::{ParameterValue, ParameterizedQuery, QueryRows};

#[test]
fn test_bind_allocates_sequential_names() {
    let mut query = ParameterizedQuery::default();
    let first = query.bind(ParameterValue::String("a".into()));
    let second = query.bind(ParameterValue::Int64(2));
    let query = query.with_sql(format!("SELECT 1 WHERE a = {} AND b = {}", first, second));

    assert_eq!(query.sql(), "SELECT 1 WHERE a = @p0 AND b = @p1");
    assert_eq!(query.parameters().len(), 2);
    assert_eq!(query.parameter("@p1"), Some(&ParameterValue::Int64(2)));
    assert_eq!(query.parameter("p0"), Some(&ParameterValue::String("a".into())));
    assert!(query.parameter("p9").is_none());
}

#[test]
fn test_parameter_types_and_wire_values() {
    let array = ParameterValue::Array(vec![ParameterValue::Int64(1), ParameterValue::Int64(2)]);
    assert_eq!(array.type_name(), "ARRAY");
    assert_eq!(array.element_type(), Some("INT64"));
    assert_eq!(array.wire_value(), json!(["1", "2"]));
    assert_eq!(array.json_value(), json!([1, 2]));

    assert_eq!(ParameterValue::Array(vec![]).element_type(), Some("STRING"));
    assert_eq!(ParameterValue::Bool(true).wire_value(), json!("true"));
    assert_eq!(ParameterValue::Date("2024-01-02".into()).type_name(), "DATE");
}

#[test]
fn test_scalar_u64_reads_numbers_and_strings() {
    let mut row = Row::new();
    row.insert("total".into(), json!("1234"));
    assert_eq!(QueryRows::new(vec![row]).scalar_u64("total"), Some(1234));

    let mut row = Row::new();
    row.insert("total".into(), json!(7));
    assert_eq!(QueryRows::new(vec![row]).scalar_u64("total"), Some(7));

    assert_eq!(QueryRows::default().scalar_u64("total"), None);
    assert_eq!(*QueryRows::affected(3).affected_rows(), Some(3));
}
