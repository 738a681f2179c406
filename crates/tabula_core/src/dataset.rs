//! Dataset descriptors.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// A named collection of tables and views in the warehouse.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters, derive_builder::Builder,
)]
#[serde(rename_all = "camelCase")]
#[builder(setter(into))]
pub struct Dataset {
    /// Dataset identifier
    id: String,
    /// Display name
    name: String,
    /// Free-text description
    #[serde(default)]
    #[builder(default)]
    description: String,
    /// Geographic location code (e.g. `US`)
    #[builder(default = "\"US\".to_string()")]
    location: String,
    /// Creation time, when the warehouse reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    created: Option<String>,
    /// Last modification time, when the warehouse reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    last_modified: Option<String>,
    /// Number of tables, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    tables: Option<usize>,
}

impl Dataset {
    /// Dataset whose display name is its identifier.
    pub fn named(id: impl Into<String>, description: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: description.into(),
            location: "US".to_string(),
            created: None,
            last_modified: None,
            tables: None,
        }
    }

    /// Attach a table count.
    pub fn with_table_count(self, tables: usize) -> Self {
        Self {
            tables: Some(tables),
            ..self
        }
    }
}
