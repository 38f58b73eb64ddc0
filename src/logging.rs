//! Logging System
//!
//! Structured logging implementation using the `tracing` crate. Provides
//! configurable log levels and output formats for the engine and any
//! embedding application.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Enable colored output (text format only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Build the filter directive string: base level plus per-module overrides.
    fn filter_directives(&self) -> String {
        let mut directives = vec![self.level.clone()];
        for (module, level) in &self.modules {
            directives.push(format!("{}={}", module, level));
        }
        directives.join(",")
    }
}

/// Initialize the logging system
///
/// `RUST_LOG` takes precedence over the configured level when set. Returns
/// an error if the subscriber is already installed or the level string is
/// invalid.
pub fn init_logging(config: &LoggingConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_directives()))
        .map_err(|e| EngineError::Config(format!("Invalid log level: {}", e)))?;

    let registry = Registry::default().with(filter);

    match config.format.as_str() {
        "json" => {
            let layer = fmt::layer()
                .json()
                .with_timer(ChronoUtc::rfc_3339())
                .with_target(true);
            registry
                .with(layer)
                .try_init()
                .map_err(|e| EngineError::Config(format!("Failed to init logging: {}", e)))?;
        }
        _ => {
            let layer = fmt::layer()
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(use_ansi_color(config))
                .with_target(true);
            registry
                .with(layer)
                .try_init()
                .map_err(|e| EngineError::Config(format!("Failed to init logging: {}", e)))?;
        }
    }

    Ok(())
}

fn use_ansi_color(config: &LoggingConfig) -> bool {
    config.color && std::env::var_os("NO_COLOR").is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_info_text() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "text");
        assert!(config.color);
    }

    #[test]
    fn filter_directives_include_module_overrides() {
        let mut config = LoggingConfig::default();
        config
            .modules
            .insert("descgen::batch".to_string(), "debug".to_string());
        let directives = config.filter_directives();
        assert!(directives.starts_with("info"));
        assert!(directives.contains("descgen::batch=debug"));
    }
}
