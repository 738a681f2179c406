//! Command-line interface for the `tabula` binary.

use crate::client::{ConsoleClient, DEFAULT_SERVER};
use crate::config::TabulaConfig;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use tabula_core::{
    ExportFormat, FilterCondition, FilterDataType, SortCondition, TableDataOptions, TableKind,
    rows_to_csv,
};
use tabula_error::InputError;
use tabula_server::create_router;
use tabula_warehouse::TableService;
use tracing::info;

/// Warehouse admin console.
#[derive(Parser, Debug)]
#[command(name = "tabula", version, about)]
pub struct Cli {
    /// Emit JSON log lines
    #[arg(long, global = true, env = "TABULA_LOG_JSON")]
    pub log_json: bool,

    /// Address of a running Tabula server
    #[arg(long, global = true, env = "TABULA_SERVER", default_value = DEFAULT_SERVER)]
    pub server: String,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Row selection shared by `data` and `export`.
#[derive(clap::Args, Debug, Clone)]
pub struct RowArgs {
    /// Dataset identifier
    pub dataset: String,

    /// Table identifier
    pub table: String,

    /// Rows to skip
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// Filter as `column:operator:value[:type]`; repeatable
    #[arg(long = "filter", value_parser = parse_filter)]
    pub filters: Vec<FilterCondition>,

    /// Sort as `column[:asc|desc[:priority]]`; repeatable
    #[arg(long = "sort")]
    pub sorts: Vec<String>,

    /// Free-text search across text columns
    #[arg(long)]
    pub search: Option<String>,

    /// Comma-separated projection
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Output format
    #[arg(long, default_value = "json")]
    pub format: ExportFormat,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Configuration file (defaults to tabula.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Listen port
        #[arg(long)]
        port: Option<u16>,

        /// Listen host
        #[arg(long)]
        host: Option<String>,
    },

    /// Print the effective server configuration
    Config {
        /// Configuration file (defaults to tabula.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List datasets
    Datasets,

    /// List tables in a dataset
    Tables {
        /// Dataset identifier
        dataset: String,

        /// Substring filter on id, name or description
        #[arg(long)]
        search: Option<String>,

        /// Restrict to one kind (TABLE, VIEW, ...)
        #[arg(long = "type")]
        kind: Option<TableKind>,
    },

    /// Show a table's metadata and schema
    Schema {
        /// Dataset identifier
        dataset: String,

        /// Table identifier
        table: String,
    },

    /// Read one page of rows
    Data {
        #[command(flatten)]
        rows: RowArgs,

        /// Maximum rows to return
        #[arg(long, default_value_t = 100)]
        limit: u64,
    },

    /// Download rows through the export endpoint
    Export {
        #[command(flatten)]
        rows: RowArgs,

        /// Maximum rows to export
        #[arg(long, default_value_t = 10_000)]
        limit: u64,
    },
}

const DATA_TYPES: [&str; 4] = ["string", "number", "date", "boolean"];

/// Parse `column:operator:value[:type]`.
///
/// `in` and `between` take comma-separated values. A trailing segment naming
/// a data type is split off; anything else stays part of the value.
pub fn parse_filter(raw: &str) -> Result<FilterCondition, InputError> {
    let mut parts = raw.splitn(3, ':');
    let column = parts.next().unwrap_or_default().trim();
    let operator = parts.next().unwrap_or_default().trim();
    let rest = parts.next().unwrap_or_default();
    if column.is_empty() || operator.is_empty() {
        return Err(InputError::malformed(
            "filter",
            format!("expected column:operator:value[:type], got '{}'", raw),
        ));
    }

    let (text, data_type) = match rest.rsplit_once(':') {
        Some((value, kind)) if DATA_TYPES.contains(&kind.to_ascii_lowercase().as_str()) => {
            (value, kind.to_ascii_lowercase())
        }
        _ => (rest, FilterDataType::String.to_string()),
    };

    let scalar = |s: &str| -> Value {
        let s = s.trim();
        if data_type == "number" || data_type == "boolean" {
            serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
        } else {
            Value::String(s.to_string())
        }
    };
    let value = match operator {
        "in" | "between" => Value::Array(text.split(',').map(scalar).collect()),
        _ => scalar(text),
    };

    serde_json::from_value(json!({
        "column": column,
        "operator": operator,
        "value": value,
        "dataType": data_type,
    }))
    .map_err(|e| InputError::malformed("filter", format!("'{}': {}", raw, e)))
}

/// Parse `column[:direction[:priority]]`; priority defaults to `position`.
pub fn parse_sort(raw: &str, position: usize) -> Result<SortCondition, InputError> {
    let mut parts = raw.split(':');
    let column = parts.next().unwrap_or_default().trim();
    if column.is_empty() {
        return Err(InputError::malformed("sort", format!("missing column in '{}'", raw)));
    }
    let direction = parts.next().unwrap_or("asc").trim();
    let priority = match parts.next() {
        Some(p) => p
            .trim()
            .parse::<i64>()
            .map_err(|e| InputError::malformed("sort", format!("'{}': {}", raw, e)))?,
        None => position as i64,
    };

    serde_json::from_value(json!({
        "column": column,
        "direction": direction,
        "priority": priority,
    }))
    .map_err(|e| InputError::malformed("sort", format!("'{}': {}", raw, e)))
}

impl RowArgs {
    /// Options for a read of at most `limit` rows.
    pub fn options(&self, limit: u64) -> Result<TableDataOptions, InputError> {
        let sorts = self
            .sorts
            .iter()
            .enumerate()
            .map(|(i, raw)| parse_sort(raw, i))
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = TableDataOptions::builder();
        builder
            .limit(limit)
            .offset(self.offset)
            .filters(self.filters.clone())
            .sorts(sorts);
        if let Some(search) = &self.search {
            builder.search(search.clone());
        }
        if !self.columns.is_empty() {
            builder.columns(self.columns.clone());
        }
        builder
            .build()
            .map_err(|e| InputError::malformed("options", e.to_string()))
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run the HTTP server until Ctrl+C.
pub async fn serve(config: TabulaConfig) -> anyhow::Result<()> {
    let backend = config.backend().await;
    info!(backend = backend.name(), "Selected warehouse backend");

    let service = TableService::new(backend, config.service_settings());
    let app = create_router(service);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(address = %address, "Tabula server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
            info!("Shutting down Tabula server");
        })
        .await?;
    Ok(())
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = ConsoleClient::new(&cli.server);

    match cli.command {
        Commands::Serve { config, port, host } => {
            let config = TabulaConfig::from_env(config.as_deref())?.with_listen(host, port);
            serve(config).await
        }
        Commands::Config { config } => {
            print!("{}", TabulaConfig::from_env(config.as_deref())?.to_toml()?);
            Ok(())
        }
        Commands::Datasets => print_json(&client.datasets().await?),
        Commands::Tables {
            dataset,
            search,
            kind,
        } => print_json(&client.tables(&dataset, search.as_deref(), kind).await?),
        Commands::Schema { dataset, table } => print_json(&client.schema(&dataset, &table).await?),
        Commands::Data { rows, limit } => {
            let options = rows.options(limit)?;
            let page = client.data(&rows.dataset, &rows.table, &options).await?;
            match rows.format {
                ExportFormat::Json => print_json(&page),
                ExportFormat::Csv => {
                    print!("{}", rows_to_csv(page.data())?);
                    Ok(())
                }
            }
        }
        Commands::Export { rows, limit } => {
            let options = rows.options(limit)?;
            let body = client
                .export(&rows.dataset, &rows.table, rows.format, &options)
                .await?;
            print!("{}", body);
            Ok(())
        }
    }
}
