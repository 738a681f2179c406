//! Service account credentials.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use gcp_bigquery_client::yup_oauth2::{ServiceAccountKey, parse_service_account_key};
use tabula_error::ConfigError;
use tracing::{debug, instrument};

/// Decode service account credentials given as raw JSON or base64 JSON.
///
/// Returns the JSON text.
///
/// ```
/// use tabula_warehouse::decode_credentials;
///
/// let raw = r#"{"type": "service_account"}"#;
/// assert_eq!(decode_credentials(raw).unwrap(), raw);
/// assert!(decode_credentials("not credentials").is_err());
/// ```
pub fn decode_credentials(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::new("Credentials are empty"));
    }

    let json = if trimmed.starts_with('{') {
        trimmed.to_string()
    } else {
        let bytes = STANDARD
            .decode(trimmed)
            .map_err(|e| ConfigError::new(format!("Credentials are neither JSON nor base64: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| ConfigError::new(format!("Decoded credentials are not UTF-8: {}", e)))?
    };

    let parsed: serde_json::Value = serde_json::from_str(&json)
        .map_err(|e| ConfigError::new(format!("Credentials are not valid JSON: {}", e)))?;
    if !parsed.is_object() {
        return Err(ConfigError::new("Credentials must be a JSON object"));
    }
    Ok(json)
}

/// Parse service account credentials (raw or base64 JSON) into a key.
///
/// # Errors
///
/// Returns an error if the credentials cannot be decoded or lack the fields
/// of a service account key.
#[instrument(skip(raw))]
pub fn service_account_key(raw: &str) -> Result<ServiceAccountKey, ConfigError> {
    let json = decode_credentials(raw)?;
    let key = parse_service_account_key(&json)
        .map_err(|e| ConfigError::new(format!("Invalid service account key: {}", e)))?;
    debug!(client_email = %key.client_email, "Service account key parsed");
    Ok(key)
}
