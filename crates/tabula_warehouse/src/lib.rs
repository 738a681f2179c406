//! Warehouse access for the Tabula console.
//!
//! Turns table data options into parameterized GoogleSQL, runs it against
//! BigQuery through `gcp-bigquery-client`, and falls back to deterministic
//! fixture data when no warehouse is configured.

mod auth;
mod client;
pub mod fixtures;
mod identifier;
mod rows;
mod service;
pub mod translate;

pub use auth::{decode_credentials, service_account_key};
pub use client::{BigQueryClient, classify_error, query_request};
pub use identifier::{TableTarget, quote_identifier, sanitize_identifier, validate_path};
pub use rows::{decode_response, millis_to_rfc3339};
pub use service::{
    BulkResponse, RowUpdateResponse, ServiceSettings, ServiceSettingsBuilder, TableService,
    WarehouseBackend,
};
