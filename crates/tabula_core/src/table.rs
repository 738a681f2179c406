//! Table descriptors and derived table details.

use crate::SchemaField;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of relation.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum TableKind {
    /// Stored table
    #[default]
    Table,
    /// Logical view without stored rows
    View,
    /// Materialized view
    MaterializedView,
    /// Externally stored table
    External,
    /// Point-in-time snapshot
    Snapshot,
}

impl TableKind {
    /// Parse a warehouse kind, treating unknown kinds as tables.
    pub fn from_warehouse(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }

    /// True when the relation has no stored row or byte counts.
    pub fn is_view(&self) -> bool {
        matches!(self, TableKind::View)
    }
}

/// A queryable relation and its best-effort size statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_builder::Builder)]
#[serde(rename_all = "camelCase")]
#[builder(setter(into))]
pub struct Table {
    /// Table identifier
    id: String,
    /// Display name
    name: String,
    /// Table or view
    #[serde(rename = "type")]
    #[builder(default)]
    kind: TableKind,
    /// Row count; zero for views
    #[builder(default)]
    num_rows: u64,
    /// Stored size in bytes; zero for views
    #[builder(default)]
    num_bytes: u64,
    /// Creation timestamp
    #[serde(default)]
    #[builder(default)]
    created_time: String,
    /// Last modification timestamp
    #[serde(default)]
    #[builder(default)]
    modified_time: String,
    /// Free-text description
    #[serde(default)]
    #[builder(default)]
    description: String,
    /// Label mapping
    #[serde(default)]
    #[builder(default)]
    labels: BTreeMap<String, String>,
    /// Location code
    #[builder(default = "\"US\".to_string()")]
    location: String,
}

impl Table {
    /// Zeroed entry used when a table's metadata cannot be read.
    pub fn placeholder(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind: TableKind::Table,
            num_rows: 0,
            num_bytes: 0,
            created_time: String::new(),
            modified_time: String::new(),
            description: String::new(),
            labels: BTreeMap::new(),
            location: "US".to_string(),
        }
    }

    /// Replace the row and byte statistics.
    pub fn with_stats(self, num_rows: u64, num_bytes: u64) -> Self {
        Self {
            num_rows,
            num_bytes,
            ..self
        }
    }

    /// Case-insensitive substring match on id, name or description.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.id.to_lowercase().contains(&needle)
            || self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}

/// Table metadata, its schema and the columns a user may edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct TableDetails {
    /// Table metadata
    table: Table,
    /// Column schema
    schema: Vec<SchemaField>,
    /// Columns open to editing
    editable_columns: Vec<String>,
}

impl TableDetails {
    /// Build details, deriving the editable columns from the schema.
    pub fn new(table: Table, schema: Vec<SchemaField>, id_column: &str) -> Self {
        let editable_columns = editable_columns(&schema, id_column);
        Self {
            table,
            schema,
            editable_columns,
        }
    }
}

/// Columns a user may edit: everything except the identifier column and
/// audit timestamps (`created_at` / `updated_at`).
pub fn editable_columns(schema: &[SchemaField], id_column: &str) -> Vec<String> {
    schema
        .iter()
        .map(|field| field.name())
        .filter(|name| name.as_str() != id_column)
        .filter(|name| !name.contains("created_at") && !name.contains("updated_at"))
        .cloned()
        .collect()
}

/// Listing controls for `GET /api/datasets/:datasetId/tables`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct TableListQuery {
    /// Substring filter on id, name or description
    search: Option<String>,
    /// Restrict to one kind
    kind: Option<TableKind>,
    /// Page size
    limit: Option<usize>,
    /// Entries to skip
    offset: Option<usize>,
}

impl TableListQuery {
    /// Create listing controls.
    pub fn new(
        search: Option<String>,
        kind: Option<TableKind>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Self {
        Self {
            search,
            kind,
            limit,
            offset,
        }
    }

    /// Apply search, kind, offset and limit, in that order.
    pub fn apply(&self, tables: Vec<Table>) -> Vec<Table> {
        let filtered = tables
            .into_iter()
            .filter(|t| self.search.as_deref().is_none_or(|s| t.matches_search(s)))
            .filter(|t| self.kind.is_none_or(|k| t.kind == k))
            .skip(self.offset.unwrap_or(0));
        match self.limit {
            Some(limit) => filtered.take(limit).collect(),
            None => filtered.collect(),
        }
    }
}
