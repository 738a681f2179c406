//! Tests for layered configuration and backend selection.

use std::collections::HashMap;
use std::time::Duration;
use tabula::{TabulaConfig, WarehouseBackend};

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_defaults_without_sources() {
    let config = TabulaConfig::load(None, &HashMap::new()).expect("load");
    assert_eq!(config, TabulaConfig::default());
    assert_eq!(config.bind_address(), "0.0.0.0:3001");
    assert_eq!(config.location(), "US");
    assert!(config.warehouse_credentials().is_none());

    let settings = config.service_settings();
    assert_eq!(*settings.query_timeout(), Duration::from_secs(60));
    assert_eq!(*settings.count_timeout(), Duration::from_secs(30));
    assert_eq!(settings.id_column(), "id");
}

#[test]
fn test_prefixed_environment_overrides() {
    let config = TabulaConfig::load(
        None,
        &env(&[
            ("TABULA_PORT", "4000"),
            ("TABULA_QUERY_TIMEOUT_MS", "5000"),
            ("TABULA_MAX_LIMIT", "500"),
            ("TABULA_ID_COLUMN", "row_id"),
            ("TABULA_LOG_JSON", "true"),
            ("UNRELATED", "ignored"),
        ]),
    )
    .expect("load");

    assert_eq!(*config.port(), 4000);
    assert_eq!(*config.query_timeout_ms(), 5000);
    assert_eq!(*config.max_limit(), Some(500));
    assert_eq!(config.id_column(), "row_id");
    assert!(*config.log_json());
    assert_eq!(*config.service_settings().max_limit(), Some(500));
}

#[test]
fn test_well_known_variables_win() {
    let config = TabulaConfig::load(
        None,
        &env(&[
            ("TABULA_PROJECT_ID", "from-prefix"),
            ("GOOGLE_CLOUD_PROJECT_ID", "from-google"),
            ("GOOGLE_APPLICATION_CREDENTIALS_JSON", "{}"),
            ("PORT", "8080"),
        ]),
    )
    .expect("load");

    assert_eq!(config.project_id().as_deref(), Some("from-google"));
    assert_eq!(*config.port(), 8080);
    assert_eq!(
        config.warehouse_credentials(),
        Some(("from-google".to_string(), "{}".to_string()))
    );
}

#[test]
fn test_blank_well_known_variables_are_ignored() {
    let config = TabulaConfig::load(None, &env(&[("GOOGLE_CLOUD_PROJECT_ID", "  "), ("PORT", "")]))
        .expect("load");
    assert!(config.project_id().is_none());
    assert_eq!(*config.port(), 3001);
}

#[test]
fn test_file_source_below_environment() {
    let path = std::env::temp_dir().join(format!("tabula-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(
        &path,
        "project_id = \"file-project\"\nhost = \"127.0.0.1\"\nport = 9000\nlocation = \"EU\"\n",
    )
    .expect("write config");

    let config = TabulaConfig::load(Some(&path), &env(&[("TABULA_PORT", "9100")]));
    std::fs::remove_file(&path).ok();
    let config = config.expect("load");

    assert_eq!(config.project_id().as_deref(), Some("file-project"));
    assert_eq!(config.location(), "EU");
    assert_eq!(config.bind_address(), "127.0.0.1:9100");
}

#[test]
fn test_named_file_must_exist() {
    let path = std::env::temp_dir().join(format!("missing-{}.toml", uuid::Uuid::new_v4()));
    let err = TabulaConfig::load(Some(&path), &HashMap::new()).expect_err("missing file");
    assert!(err.message.contains("Failed to load configuration"));
}

#[test]
fn test_wrongly_typed_value_is_rejected() {
    let err = TabulaConfig::load(None, &env(&[("TABULA_PORT", "not-a-port")]))
        .expect_err("bad port");
    assert!(err.message.contains("configuration"));
}

#[test]
fn test_listen_overrides_and_builder() {
    let config = TabulaConfig::builder()
        .project_id("proj")
        .port(7000u16)
        .build()
        .expect("build");
    assert_eq!(config.project_id().as_deref(), Some("proj"));
    assert_eq!(config.host(), "0.0.0.0");

    let config = config.with_listen(Some("localhost".to_string()), None);
    assert_eq!(config.bind_address(), "localhost:7000");
}

#[test]
fn test_debug_redacts_credentials() {
    let config = TabulaConfig::builder()
        .credentials("super-secret-key")
        .build()
        .expect("build");
    let rendered = format!("{:?}", config);
    assert!(rendered.contains("<redacted>"));
    assert!(!rendered.contains("super-secret-key"));
}

#[tokio::test]
async fn test_backend_without_credentials_uses_fixtures() {
    let config = TabulaConfig::builder().project_id("proj").build().expect("build");
    let backend = config.backend().await;
    assert!(matches!(backend, WarehouseBackend::Unavailable));
    assert_eq!(backend.name(), "fixture");
}

#[tokio::test]
async fn test_backend_with_bad_credentials_uses_fixtures() {
    let config = TabulaConfig::builder()
        .project_id("proj")
        .credentials("definitely not a service account")
        .build()
        .expect("build");
    assert!(!config.backend().await.is_connected());
}

#[test]
fn test_toml_rendering_masks_credentials() {
    let config = TabulaConfig::builder()
        .project_id("proj")
        .credentials("{\"private_key\":\"secret\"}")
        .build()
        .expect("build");
    let rendered = config.to_toml().expect("toml");
    assert!(rendered.contains("project_id = \"proj\""));
    assert!(rendered.contains("port = 3001"));
    assert!(rendered.contains("<redacted>"));
    assert!(!rendered.contains("secret"));
}
