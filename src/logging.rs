//! Structured logging setup.
//!
//! Thin wrapper over `tracing-subscriber`: env-filter levels, a choice of
//! stdout formats, and optional file output via `tracing-appender`.
//!
//! # Component targets
//!
//! Events use module-path targets, so components can be filtered
//! individually:
//!
//! ```bash
//! # Debug only the controller
//! RUST_LOG=frametune::controller=debug cargo run --bin frame_sim
//!
//! # Warn for all, trace the solver
//! RUST_LOG=warn,frametune::solver=trace cargo run --bin knapsack_demo
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Log output format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable format (default for development)
    #[default]
    Pretty,
    /// JSON format (best for log aggregation)
    Json,
    /// Compact single-line format
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default level filter when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Stdout format.
    #[serde(default)]
    pub format: LogFormat,

    /// Optional log file, opened in append mode.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            log_file: None,
        }
    }
}

/// Component log targets, for `RUST_LOG` filtering.
pub mod targets {
    pub const CONTROLLER: &str = "frametune::controller";
    pub const SOLVER: &str = "frametune::solver";
    pub const PROFILE: &str = "frametune::profile";
}

/// Install the global subscriber.
///
/// Returns the file writer guard when file logging is enabled; hold it for
/// as long as logs should flush. Calling twice is harmless: the second
/// install is ignored.
pub fn init_logging(config: &LogConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let stdout_layer = match config.format {
        LogFormat::Pretty => fmt::layer().boxed(),
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .unwrap_or_else(|| std::ffi::OsStr::new("frametune.log"));
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_format_serde_names() {
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), "\"json\"");
        let parsed: LogFormat = serde_json::from_str("\"compact\"").unwrap();
        assert_eq!(parsed, LogFormat::Compact);
    }
}
