//! Subscriber setup for the binary.
//!
//! Library code only emits `tracing` events (and `log` records from the
//! database layer); nothing here runs unless a caller installs it.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or `batchimport=debug`.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },

    #[error("A global subscriber is already installed")]
    AlreadyInitialized,
}

fn build_filter(settings: &LogSettings) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&settings.level).map_err(|e| LoggingError::InvalidFilter {
        directive: settings.level.clone(),
        reason: e.to_string(),
    })
}

/// Installs the global subscriber and routes `log` records into it.
///
/// Output goes to stderr so stdout stays free for the run summary.
pub fn init_logging(settings: &LogSettings) -> Result<(), LoggingError> {
    let filter = build_filter(settings)?;

    let output = match settings.format {
        LogFormat::Text => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .boxed(),
    };

    let subscriber = Registry::default().with(filter).with(output);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|_| LoggingError::AlreadyInitialized)?;
    tracing_log::LogTracer::init().map_err(|_| LoggingError::AlreadyInitialized)?;
    Ok(())
}
