//! Layered configuration and warehouse backend selection.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file, `TABULA_*` environment variables, then the well-known
//! `GOOGLE_CLOUD_PROJECT_ID`, `GOOGLE_APPLICATION_CREDENTIALS_JSON` and
//! `PORT` variables.

use config::{Config, Environment, File, FileFormat};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tabula_error::ConfigError;
use tabula_warehouse::{BigQueryClient, ServiceSettings, WarehouseBackend};
use tracing::{info, instrument, warn};

/// File read when no `--config` path is given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "tabula.toml";

/// Server and warehouse settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_builder::Builder)]
#[serde(default)]
#[builder(setter(into), default)]
pub struct TabulaConfig {
    /// Warehouse project; absent means fixture data
    #[builder(setter(into, strip_option))]
    project_id: Option<String>,
    /// Service account JSON, raw or base64; absent means fixture data
    #[builder(setter(into, strip_option))]
    credentials: Option<String>,
    /// Processing location
    location: String,
    /// Listen address
    host: String,
    /// Listen port
    port: u16,
    /// Deadline for data queries and DML, in milliseconds
    query_timeout_ms: u64,
    /// Deadline for count queries, in milliseconds
    count_timeout_ms: u64,
    /// Upper bound on page size
    #[builder(setter(into, strip_option))]
    max_limit: Option<u64>,
    /// Key column for row mutations
    id_column: String,
    /// Emit JSON log lines
    log_json: bool,
}

impl Default for TabulaConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            credentials: None,
            location: "US".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3001,
            query_timeout_ms: 60_000,
            count_timeout_ms: 30_000,
            max_limit: None,
            id_column: "id".to_string(),
            log_json: false,
        }
    }
}

impl std::fmt::Debug for TabulaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabulaConfig")
            .field("project_id", &self.project_id)
            .field("credentials", &self.credentials.as_ref().map(|_| "<redacted>"))
            .field("location", &self.location)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("query_timeout_ms", &self.query_timeout_ms)
            .field("count_timeout_ms", &self.count_timeout_ms)
            .field("max_limit", &self.max_limit)
            .field("id_column", &self.id_column)
            .field("log_json", &self.log_json)
            .finish()
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl TabulaConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> TabulaConfigBuilder {
        TabulaConfigBuilder::default()
    }

    /// Load configuration from `file` (or `tabula.toml` when present) and
    /// the variables in `env`.
    ///
    /// An explicitly named file must exist; the default file is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or a value has the wrong
    /// type.
    #[instrument(skip(env))]
    pub fn load(file: Option<&Path>, env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let file_source = match file {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE)
                .format(FileFormat::Toml)
                .required(false),
        };

        let prefixed: config::Map<String, String> = env
            .iter()
            .filter(|(key, _)| key.starts_with("TABULA_"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let settings = Config::builder()
            .add_source(file_source)
            .add_source(
                Environment::with_prefix("TABULA")
                    .try_parsing(true)
                    .source(Some(prefixed)),
            )
            .set_override_option("project_id", non_blank(env.get("GOOGLE_CLOUD_PROJECT_ID")))
            .and_then(|b| {
                b.set_override_option(
                    "credentials",
                    non_blank(env.get("GOOGLE_APPLICATION_CREDENTIALS_JSON")),
                )
            })
            .and_then(|b| b.set_override_option("port", non_blank(env.get("PORT"))))
            .and_then(|b| b.build())
            .map_err(|e| ConfigError::new(format!("Failed to load configuration: {}", e)))?;

        settings
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Invalid configuration: {}", e)))
    }

    /// Load configuration from `file` and the process environment.
    ///
    /// # Errors
    ///
    /// See [`TabulaConfig::load`].
    pub fn from_env(file: Option<&Path>) -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::load(file, &env)
    }

    /// Limits handed to the table service.
    pub fn service_settings(&self) -> ServiceSettings {
        let defaults = ServiceSettings::default();
        ServiceSettings::builder()
            .query_timeout(Duration::from_millis(self.query_timeout_ms))
            .count_timeout(Duration::from_millis(self.count_timeout_ms))
            .id_column(self.id_column.clone())
            .max_limit(self.max_limit)
            .build()
            .unwrap_or(defaults)
    }

    /// Copy with the credentials masked, for display.
    pub fn redacted(&self) -> Self {
        Self {
            credentials: self.credentials.as_ref().map(|_| "<redacted>".to_string()),
            ..self.clone()
        }
    }

    /// Effective configuration as TOML, credentials masked.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(&self.redacted())
            .map_err(|e| ConfigError::new(format!("Failed to render configuration: {}", e)))
    }

    /// Replace the listen host and port where given.
    pub fn with_listen(self, host: Option<String>, port: Option<u16>) -> Self {
        Self {
            host: host.unwrap_or(self.host),
            port: port.unwrap_or(self.port),
            ..self
        }
    }

    /// `host:port` to listen on.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Project and credentials, when both are configured.
    pub fn warehouse_credentials(&self) -> Option<(String, String)> {
        let project = non_blank(self.project_id.as_ref())?;
        let credentials = non_blank(self.credentials.as_ref())?;
        Some((project, credentials))
    }

    /// Connect to the warehouse, or fall back to fixture data.
    ///
    /// Missing settings, undecodable credentials or a client that cannot be
    /// built select [`WarehouseBackend::Unavailable`].
    #[instrument(skip(self), fields(project_id = ?self.project_id))]
    pub async fn backend(&self) -> WarehouseBackend {
        let Some((project, credentials)) = self.warehouse_credentials() else {
            warn!("Warehouse project or credentials not configured, serving fixture data");
            return WarehouseBackend::Unavailable;
        };

        match BigQueryClient::connect(&project, &credentials, Some(self.location.clone())).await {
            Ok(client) => {
                info!(project_id = %project, location = %self.location, "Connected to warehouse");
                WarehouseBackend::Connected(Arc::new(client))
            }
            Err(e) => {
                warn!(error = %e, "Warehouse client unavailable, serving fixture data");
                WarehouseBackend::Unavailable
            }
        }
    }
}
