//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `SPECIFICATR_`, nested keys separated by `__`)
//! 2. Configuration file: `./specificatr.toml` or an explicit path
//! 3. Default values
//!
//! # Example
//!
//! ```toml
//! [logging]
//! level = "specificatr=debug"
//! json = true
//!
//! [context]
//! name = "orders"
//! strict_includes = false
//! ```

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "specificatr.toml";

/// Prefix of environment variable overrides
pub const ENV_PREFIX: &str = "SPECIFICATR_";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Data context configuration
    #[serde(default)]
    pub context: ContextConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `specificatr=debug`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Data context configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Name reported in the context's tracing events
    #[serde(default = "default_context_name")]
    pub name: String,

    /// Reject include paths that do not start with a declared navigation
    #[serde(default = "default_strict_includes")]
    pub strict_includes: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            name: default_context_name(),
            strict_includes: default_strict_includes(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_context_name() -> String {
    "specificatr".to_string()
}

fn default_strict_includes() -> bool {
    true
}

impl Config {
    /// Load configuration from `./specificatr.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file
    ///
    /// A missing file is not an error; defaults and environment variables
    /// still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
        } else {
            tracing::debug!("No configuration file at {}, using defaults", path.display());
        }

        let config = Self::figment(path).extract()?;
        Ok(config)
    }

    /// The layered provider stack used by [`load_from`](Self::load_from)
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Config::default()))
            // Load from config file (if exists)
            .merge(Toml::file(path.as_ref()))
            // Override with environment variables
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}
