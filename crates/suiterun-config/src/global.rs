//! Global Configuration (~/.suiterun/config.toml)
//!
//! Handles user-level defaults stored in `~/.suiterun/config.toml`.
//! Project values always win over these.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.suiterun/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DefaultsConfig {
    /// Program used for forked processes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java: Option<PathBuf>,

    /// Debugger port for forked processes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debugger_port: Option<u16>,

    /// Log forked commands at info level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_command: Option<bool>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(defaults) = &self.defaults {
            if defaults.debugger_port == Some(0) {
                return Err(ConfigError::invalid_value(
                    "defaults.debugger-port",
                    "port cannot be 0",
                ));
            }
        }
        Ok(())
    }

    /// Get the global config file path (~/.suiterun/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".suiterun").join("config.toml"))
    }

    /// Default program for forked processes
    pub fn default_java(&self) -> Option<&Path> {
        self.defaults.as_ref().and_then(|d| d.java.as_deref())
    }

    /// Default debugger port
    pub fn default_debugger_port(&self) -> Option<u16> {
        self.defaults.as_ref().and_then(|d| d.debugger_port)
    }

    /// Default command logging
    pub fn default_log_command(&self) -> Option<bool> {
        self.defaults.as_ref().and_then(|d| d.log_command)
    }
}
