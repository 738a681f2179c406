//! Tabula: an admin console for a cloud data warehouse.
//!
//! This facade crate re-exports the workspace and adds layered
//! configuration, the command-line interface and a client for a running
//! Tabula server.
//!
//! # Example
//!
//! ```no_run
//! use tabula::{TableService, TabulaConfig, create_router};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = TabulaConfig::from_env(None)?;
//! let service = TableService::new(config.backend().await, config.service_settings());
//! let app = create_router(service);
//! let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

mod cli;
mod client;
mod config;

pub use cli::{Cli, Commands, RowArgs, parse_filter, parse_sort, run, serve};
pub use client::{ConsoleClient, DEFAULT_SERVER, options_query};
pub use config::{DEFAULT_CONFIG_FILE, TabulaConfig, TabulaConfigBuilder};

pub use tabula_core::*;
pub use tabula_error::*;
pub use tabula_interface::*;
pub use tabula_server::{ApiError, ApiState, ErrorBody, create_router};
pub use tabula_warehouse::{
    BigQueryClient, ServiceSettings, TableService, WarehouseBackend, decode_credentials,
};
