//! Tracing subscriber setup shared by the ingestion binaries

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level. Output goes to stderr unless a
/// log file is configured.
pub fn init_logging(config: &LoggingConfig, crate_name: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level, crate_name)));

    let registry = tracing_subscriber::registry().with(filter);

    let result = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
        }
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {}", e)))
}

/// Filter directive scoping the configured level to our crates
fn default_directive(level: &str, crate_name: &str) -> String {
    let level = match level.to_ascii_lowercase().as_str() {
        l @ ("trace" | "debug" | "info" | "warn" | "error") => l.to_string(),
        _ => "info".to_string(),
    };
    format!("warn,{}={},aspk_common={}", crate_name, level, level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_scopes_crate() {
        assert_eq!(
            default_directive("debug", "aspk_ingest"),
            "warn,aspk_ingest=debug,aspk_common=debug"
        );
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        assert_eq!(
            default_directive("loud", "aspk_ingest"),
            "warn,aspk_ingest=info,aspk_common=info"
        );
    }
}
