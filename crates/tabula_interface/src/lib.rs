//! Trait definitions for the Tabula warehouse console.
//!
//! The [`Warehouse`] trait is the seam between query construction and the
//! remote datastore. Queries cross it as SQL text plus named parameters.

mod query;
mod warehouse;

pub use query::{ParameterValue, ParameterizedQuery, QueryParameter, QueryRows};
pub use warehouse::{TableMetadata, TableRef, Warehouse};
