//! Project Configuration (suiterun.toml)
//!
//! Handles project-level configuration stored in `suiterun.toml` at the project root.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Project configuration file name
pub const PROJECT_CONFIG_FILE: &str = "suiterun.toml";

/// Project configuration from suiterun.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ProjectConfig {
    /// Compiled output and classpath locations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<PathsConfig>,

    /// Which suites and tests to run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionConfig>,

    /// Forked process settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fork: Option<ForkConfig>,

    /// Remote debugging of forked processes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugConfig>,

    /// In-process entry point lookup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_process: Option<InProcessConfig>,
}

/// A list given either as one comma-separated string or as an array
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ListValue {
    /// "a,b,c"
    Joined(String),
    /// ["a", "b", "c"]
    Items(Vec<String>),
}

impl ListValue {
    /// Comma-separated form
    pub fn to_comma_separated(&self) -> String {
        match self {
            Self::Joined(value) => value.clone(),
            Self::Items(items) => items.join(","),
        }
    }

    /// Individual entries, trimmed, empties dropped
    pub fn entries(&self) -> Vec<String> {
        match self {
            Self::Joined(value) => value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Self::Items(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl From<&str> for ListValue {
    fn from(value: &str) -> Self {
        Self::Joined(value.to_string())
    }
}

/// Output directories and classpath
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PathsConfig {
    /// Compiled main output (default: "target/classes")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Compiled test output (default: "target/test-classes")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_output: Option<PathBuf>,

    /// Extra runpath elements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runpath: Option<ListValue>,

    /// Extra test classpath elements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classpath: Option<ListValue>,
}

/// Suite and test selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SelectionConfig {
    /// Suites, each optionally followed by a test name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suites: Option<ListValue>,

    /// Test names (prefix with '@' for an exact match)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests: Option<ListValue>,

    /// Suffix filters for discovered suites
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffixes: Option<ListValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags_to_include: Option<ListValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags_to_exclude: Option<ListValue>,

    /// Packages whose direct members are run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members_only_suites: Option<ListValue>,

    /// Packages whose members are run recursively
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wildcard_suites: Option<ListValue>,

    /// TestNG XML configuration files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub testng_config_files: Option<ListValue>,

    /// Files receiving failed and canceled test names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_files: Option<ListValue>,

    /// Files listing tests to rerun (missing files are ignored)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests_files: Option<ListValue>,

    /// Run suites concurrently
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,

    /// Timing multiplier (default: 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_scale_factor: Option<f64>,

    /// Config parameters passed to the test tool
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
}

/// Forked process settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ForkConfig {
    /// "never", "once" or "suite-sequential"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Program to launch (default: "java")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java: Option<PathBuf>,

    /// Runner entry point
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner: Option<String>,

    /// Suite verifier entry point
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier: Option<String>,

    /// Extra arguments for the forked process
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg_line: Option<String>,

    /// Seconds before the forked process is killed (0 = never)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Log the forked command at info level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_command: Option<bool>,

    /// Keep running suites after a failure (suite-sequential only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continue_on_failure: Option<bool>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub system_properties: BTreeMap<String, String>,
}

/// Remote debugging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DebugConfig {
    /// Suspend forked processes until a debugger attaches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Debugger port (default: 5005)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Replaces the default debug arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg_line: Option<String>,
}

/// In-process entry point settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct InProcessConfig {
    /// Library name searched on the test classpath
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,

    /// Exported entry point symbol
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl ProjectConfig {
    /// Load project configuration from a file
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

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(selection) = &self.selection {
            if let Some(factor) = selection.span_scale_factor {
                if !factor.is_finite() || factor <= 0.0 {
                    return Err(ConfigError::invalid_value(
                        "selection.span-scale-factor",
                        format!("must be a positive number, got {}", factor),
                    ));
                }
            }
            validate_keys("selection.config", selection.config.keys())?;
        }

        if let Some(fork) = &self.fork {
            validate_keys("fork.environment", fork.environment.keys())?;
            validate_keys("fork.system-properties", fork.system_properties.keys())?;
        }

        if let Some(debug) = &self.debug {
            if debug.port == Some(0) {
                return Err(ConfigError::invalid_value(
                    "debug.port",
                    "port cannot be 0",
                ));
            }
        }

        // Fork mode strings are resolved leniently at run time, not rejected here.
        Ok(())
    }

    /// Selection section, created on first use
    pub fn selection_mut(&mut self) -> &mut SelectionConfig {
        self.selection.get_or_insert_with(Default::default)
    }

    /// Fork section, created on first use
    pub fn fork_mut(&mut self) -> &mut ForkConfig {
        self.fork.get_or_insert_with(Default::default)
    }

    /// Debug section, created on first use
    pub fn debug_mut(&mut self) -> &mut DebugConfig {
        self.debug.get_or_insert_with(Default::default)
    }

    /// Merge another project config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &ProjectConfig) {
        if let Some(paths) = &other.paths {
            self.paths.get_or_insert_with(Default::default).merge(paths);
        }
        if let Some(selection) = &other.selection {
            self.selection_mut().merge(selection);
        }
        if let Some(fork) = &other.fork {
            self.fork_mut().merge(fork);
        }
        if let Some(debug) = &other.debug {
            self.debug_mut().merge(debug);
        }
        if let Some(in_process) = &other.in_process {
            self.in_process
                .get_or_insert_with(Default::default)
                .merge(in_process);
        }
    }
}

fn overlay<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if source.is_some() {
        target.clone_from(source);
    }
}

impl PathsConfig {
    fn merge(&mut self, other: &PathsConfig) {
        overlay(&mut self.output, &other.output);
        overlay(&mut self.test_output, &other.test_output);
        overlay(&mut self.runpath, &other.runpath);
        overlay(&mut self.classpath, &other.classpath);
    }
}

impl SelectionConfig {
    fn merge(&mut self, other: &SelectionConfig) {
        overlay(&mut self.suites, &other.suites);
        overlay(&mut self.tests, &other.tests);
        overlay(&mut self.suffixes, &other.suffixes);
        overlay(&mut self.tags_to_include, &other.tags_to_include);
        overlay(&mut self.tags_to_exclude, &other.tags_to_exclude);
        overlay(&mut self.members_only_suites, &other.members_only_suites);
        overlay(&mut self.wildcard_suites, &other.wildcard_suites);
        overlay(&mut self.testng_config_files, &other.testng_config_files);
        overlay(&mut self.memory_files, &other.memory_files);
        overlay(&mut self.tests_files, &other.tests_files);
        overlay(&mut self.parallel, &other.parallel);
        overlay(&mut self.span_scale_factor, &other.span_scale_factor);
        self.config.extend(other.config.clone());
    }
}

impl ForkConfig {
    fn merge(&mut self, other: &ForkConfig) {
        overlay(&mut self.mode, &other.mode);
        overlay(&mut self.java, &other.java);
        overlay(&mut self.runner, &other.runner);
        overlay(&mut self.verifier, &other.verifier);
        overlay(&mut self.arg_line, &other.arg_line);
        overlay(&mut self.timeout, &other.timeout);
        overlay(&mut self.log_command, &other.log_command);
        overlay(&mut self.continue_on_failure, &other.continue_on_failure);
        self.environment.extend(other.environment.clone());
        self.system_properties
            .extend(other.system_properties.clone());
    }
}

impl DebugConfig {
    fn merge(&mut self, other: &DebugConfig) {
        overlay(&mut self.enabled, &other.enabled);
        overlay(&mut self.port, &other.port);
        overlay(&mut self.arg_line, &other.arg_line);
    }
}

impl InProcessConfig {
    fn merge(&mut self, other: &InProcessConfig) {
        overlay(&mut self.library, &other.library);
        overlay(&mut self.symbol, &other.symbol);
    }
}

/// Map keys become `KEY=value` tokens, so they must be non-empty
fn validate_keys<'a>(field: &str, keys: impl Iterator<Item = &'a String>) -> ConfigResult<()> {
    for key in keys {
        if key.trim().is_empty() {
            return Err(ConfigError::invalid_value(field, "keys cannot be empty"));
        }
    }
    Ok(())
}
