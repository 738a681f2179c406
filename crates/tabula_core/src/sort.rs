//! Sort conditions.

use serde::{Deserialize, Deserializer, Serialize};

/// Ordering direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending
    #[default]
    #[strum(serialize = "ASC")]
    Asc,
    /// Descending
    #[strum(serialize = "DESC")]
    Desc,
}

impl<'de> Deserialize<'de> for SortDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(serde::de::Error::custom(format!(
                "unknown sort direction '{}', expected asc or desc",
                other
            ))),
        }
    }
}

/// One ordering key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCondition {
    /// Target column
    pub column: String,
    /// Direction
    #[serde(default)]
    pub direction: SortDirection,
    /// Lower priorities sort first
    #[serde(default)]
    pub priority: i64,
}

impl SortCondition {
    /// Create a sort key.
    pub fn new(column: impl Into<String>, direction: SortDirection, priority: i64) -> Self {
        Self {
            column: column.into(),
            direction,
            priority,
        }
    }
}

/// Sort keys ordered by priority; equal priorities keep input order.
pub fn by_priority(sorts: &[SortCondition]) -> Vec<&SortCondition> {
    let mut ordered: Vec<&SortCondition> = sorts.iter().collect();
    // slice::sort_by_key is stable
    ordered.sort_by_key(|s| s.priority);
    ordered
}
