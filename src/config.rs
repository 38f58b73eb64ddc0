//! Configuration System
//!
//! Engine configuration with serde-backed defaults, TOML file sources and
//! environment variable overrides. Configuration is loaded once at engine
//! construction and immutable thereafter.

use crate::error::EngineError;
use crate::logging::LoggingConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescgenConfig {
    /// Regeneration engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Model provider configurations, keyed by provider name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Regeneration engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Age in seconds after which cached content is considered stale
    #[serde(default = "default_staleness_window_secs")]
    pub staleness_window_secs: i64,

    /// Default cost budget per batch, in abstract budget units
    #[serde(default = "default_cost_budget")]
    pub cost_budget: u32,

    /// Number of concurrent generation workers per batch
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Timeout for a single generation call (seconds)
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    /// Consecutive storage-unavailable failures before the remainder of a
    /// batch is short-circuited
    #[serde(default = "default_infra_failure_threshold")]
    pub infra_failure_threshold: usize,
}

fn default_staleness_window_secs() -> i64 {
    7 * 24 * 3600 // one week
}

fn default_cost_budget() -> u32 {
    50
}

fn default_worker_pool_size() -> usize {
    4
}

fn default_generation_timeout_secs() -> u64 {
    120
}

fn default_infra_failure_threshold() -> usize {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            staleness_window_secs: default_staleness_window_secs(),
            cost_budget: default_cost_budget(),
            worker_pool_size: default_worker_pool_size(),
            generation_timeout_secs: default_generation_timeout_secs(),
            infra_failure_threshold: default_infra_failure_threshold(),
        }
    }
}

impl EngineConfig {
    /// Validate engine configuration
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.staleness_window_secs < 0 {
            return Err(EngineError::Config(
                "staleness_window_secs cannot be negative".to_string(),
            ));
        }
        if self.worker_pool_size == 0 {
            return Err(EngineError::Config(
                "worker_pool_size must be at least 1".to_string(),
            ));
        }
        if self.generation_timeout_secs == 0 {
            return Err(EngineError::Config(
                "generation_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.infra_failure_threshold == 0 {
            return Err(EngineError::Config(
                "infra_failure_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Staleness window as a chrono duration
    pub fn staleness_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.staleness_window_secs)
    }

    /// Generation call timeout as a std duration
    pub fn generation_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.generation_timeout_secs)
    }
}

/// Model provider configuration for the OpenAI-compatible generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Model identifier, e.g. "gpt-4o-mini"
    pub model: String,

    /// API key (empty for local servers that do not require one)
    #[serde(default)]
    pub api_key: String,

    /// Base URL for custom or local endpoints
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.model.is_empty() {
            return Err(EngineError::Config("provider model cannot be empty".to_string()));
        }
        Ok(())
    }
}

impl DescgenConfig {
    /// Load configuration from an optional TOML file plus `DESCGEN_*`
    /// environment overrides, layered over defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self, EngineError> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            let path_str = path
                .to_str()
                .ok_or_else(|| EngineError::Config(format!("Invalid config path: {:?}", path)))?;
            builder = builder.add_source(File::with_name(path_str).required(true));
        }

        builder = builder.add_source(Environment::with_prefix("DESCGEN").separator("__"));

        let config = builder
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to load configuration: {}", e)))?;

        let loaded: DescgenConfig = config
            .try_deserialize()
            .map_err(|e| EngineError::Config(format!("Invalid configuration: {}", e)))?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Parse configuration from a TOML string, for embedders that manage
    /// their own file handling.
    pub fn from_toml_str(source: &str) -> Result<Self, EngineError> {
        let loaded: DescgenConfig = toml::from_str(source)
            .map_err(|e| EngineError::Config(format!("Invalid configuration: {}", e)))?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), EngineError> {
        self.engine.validate()?;
        for (name, provider) in &self.providers {
            provider
                .validate()
                .map_err(|e| EngineError::Config(format!("provider '{}': {}", name, e)))?;
        }
        Ok(())
    }
}
