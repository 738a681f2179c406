//! Tracing subscriber initialization.

use tabula_error::ConfigError;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_directive`. Events go to stderr,
/// one JSON object per line when `json` is set. Installing twice is not an
/// error; the first subscriber stays in place.
pub fn init_tracing(default_directive: &str, json: bool) -> Result<(), ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive).map_err(|e| {
            ConfigError::new(format!(
                "Invalid log directive '{}': {}",
                default_directive, e
            ))
        })?,
    };

    let installed = if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
            .try_init()
    };

    if let Err(e) = installed {
        debug!(error = %e, "Tracing subscriber already installed");
    }
    Ok(())
}
