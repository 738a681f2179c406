//! HTTP surface of the Tabula warehouse console.
//!
//! One canonical set of routes under `/api/datasets`, a liveness check at
//! `/health`, and a uniform JSON error body.

mod api;
mod error;
mod params;

pub use api::{ApiState, create_router};
pub use error::{ApiError, ErrorBody};
pub use params::{QueryMap, data_options, export_options, list_query};
