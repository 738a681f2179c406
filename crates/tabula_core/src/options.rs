//! Options bag for table data requests.

use crate::{FilterCondition, SortCondition};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Page size used when the caller does not provide one.
pub const DEFAULT_LIMIT: u64 = 100;

/// Largest `LIMIT` or `OFFSET` the warehouse accepts (a signed 64-bit integer).
pub const MAX_ROW_BOUND: u64 = i64::MAX as u64;

/// Pagination, filtering, sorting, search and projection for one read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_builder::Builder)]
#[serde(rename_all = "camelCase", default)]
#[builder(setter(into), default)]
pub struct TableDataOptions {
    /// Maximum rows to return
    limit: u64,
    /// Rows to skip
    offset: u64,
    /// AND-combined predicates, in input order
    filters: Vec<FilterCondition>,
    /// Ordering keys
    sorts: Vec<SortCondition>,
    /// Free-text search
    #[builder(setter(into, strip_option))]
    search: Option<String>,
    /// Explicit projection; `None` selects every column
    #[builder(setter(into, strip_option))]
    columns: Option<Vec<String>>,
    /// Trusted server-side predicate placed first in the WHERE clause
    #[serde(skip)]
    #[builder(setter(into, strip_option))]
    where_clause: Option<String>,
}

impl Default for TableDataOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            filters: Vec::new(),
            sorts: Vec::new(),
            search: None,
            columns: None,
            where_clause: None,
        }
    }
}

impl TableDataOptions {
    /// Start building options from the defaults.
    pub fn builder() -> TableDataOptionsBuilder {
        TableDataOptionsBuilder::default()
    }

    /// Search term with surrounding whitespace removed, if non-blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Projection with blank names dropped, if any remain.
    pub fn projection(&self) -> Option<Vec<&str>> {
        let columns: Vec<&str> = self
            .columns
            .as_ref()?
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        (!columns.is_empty()).then_some(columns)
    }

    /// Lower the limit to `max` when it exceeds it.
    pub fn clamp_limit(self, max: Option<u64>) -> Self {
        match max {
            Some(max) if self.limit > max => Self { limit: max, ..self },
            _ => self,
        }
    }
}
