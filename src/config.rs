//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - databag.toml (default configuration)
//! - databag.local.toml (git-ignored local overrides)
//! - Environment variables (DATABAG_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # databag.toml
//! [logging]
//! level = "debug"
//! format = "json"
//!
//! [store]
//! initial_capacity = 4096
//!
//! [group_by]
//! default_sort = true
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! DATABAG_LOGGING__LEVEL=trace
//! DATABAG_STORE__INITIAL_CAPACITY=128
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub group_by: GroupByConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format
    #[serde(default)]
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Store sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Initial capacity of the tables of newly created bags
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
}

/// Group-by defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupByConfig {
    /// Sort flag used by `core.unique` when the caller passes none
    #[serde(default)]
    pub default_sort: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_initial_capacity() -> usize {
    0
}

impl Config {
    /// Load configuration from the default files and the environment
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("databag.toml"))
            .merge(Toml::file("databag.local.toml"))
            .merge(Env::prefixed("DATABAG_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file, then the environment
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("DATABAG_").split("__"))
            .extract()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            initial_capacity: default_initial_capacity(),
        }
    }
}
