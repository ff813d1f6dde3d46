//! suiterun Configuration System
//!
//! Provides the configuration that drives a test run:
//! - Project configuration (suiterun.toml)
//! - Global user configuration (~/.suiterun/config.toml)
//! - Environment overrides (SUITERUN_*)
//! - The resolved, immutable [`Configuration`] handed to every component
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Global config (~/.suiterun/config.toml)
//! 3. Project config (./suiterun.toml, searched upwards)
//! 4. Environment variables (SUITERUN_*)
//! 5. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use suiterun_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! let configuration = config.resolve().unwrap();
//! ```

pub mod configuration;
pub mod fork_mode;
pub mod global;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use configuration::Configuration;
pub use fork_mode::ForkMode;
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader};
pub use project::{ListValue, ProjectConfig};
