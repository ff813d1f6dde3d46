//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::configuration::{
    Configuration, DEFAULT_DEBUGGER_PORT, DEFAULT_IN_PROCESS_LIBRARY, DEFAULT_IN_PROCESS_SYMBOL,
    DEFAULT_JAVA, DEFAULT_OUTPUT_DIR, DEFAULT_RUNNER, DEFAULT_TEST_OUTPUT_DIR, DEFAULT_VERIFIER,
    NEUTRAL_SPAN_SCALE_FACTOR,
};
use crate::global::GlobalConfig;
use crate::project::{ListValue, ProjectConfig, PROJECT_CONFIG_FILE};
use crate::{ConfigError, ConfigResult, ForkMode};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.suiterun/config.toml) - lowest priority
/// 2. Project config (./suiterun.toml) - overrides global
/// 3. Environment variables (SUITERUN_*) - overrides project
/// 4. CLI flags - highest priority (merged by the caller via [`ProjectConfig::merge`])
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration (file values plus environment overrides)
    pub project: ProjectConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Project root directory (where suiterun.toml was found)
    pub project_root: Option<PathBuf>,

    /// Directory the search started from
    pub start_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use a specific global config file instead of ~/.suiterun/config.toml
    pub fn with_global_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find suiterun.toml, then loads and merges
    /// global config if it exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        let global_config = self.load_global_config()?;
        let project_config = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
            start_dir: start_dir.to_path_buf(),
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let global_config = self.load_global_config()?;
        let project_config = self.apply_env_overrides(project_config)?;

        let project_root = config_path.parent().map(|p| p.to_path_buf());
        let start_dir = project_root.clone().unwrap_or_else(|| PathBuf::from("."));

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
            start_dir,
        })
    }

    /// Find project configuration by walking up directory tree
    ///
    /// Returns (project_root, project_config); a missing file yields the defaults
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_FILE);

            if config_path.exists() {
                tracing::debug!(path = %config_path.display(), "loading project config");
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Load global configuration; a missing file or home directory yields the defaults
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => match GlobalConfig::global_config_path() {
                Ok(path) => {
                    self.global_config_path = Some(path.clone());
                    path
                }
                Err(ConfigError::HomeNotFound) => return Ok(GlobalConfig::default()),
                Err(e) => return Err(e),
            },
        };

        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides to project config
    ///
    /// Environment variables follow the pattern: SUITERUN_<KEY>
    /// Example: SUITERUN_FORK_MODE=suite-sequential
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Ok(mode) = env::var("SUITERUN_FORK_MODE") {
            config.fork_mut().mode = Some(mode);
        }
        if let Ok(java) = env::var("SUITERUN_JAVA") {
            config.fork_mut().java = Some(PathBuf::from(java));
        }
        if let Ok(timeout) = env::var("SUITERUN_TIMEOUT") {
            let timeout = timeout.trim().parse::<u64>().map_err(|e| {
                ConfigError::invalid_value("SUITERUN_TIMEOUT", format!("'{}': {}", timeout, e))
            })?;
            config.fork_mut().timeout = Some(timeout);
        }

        if let Ok(suites) = env::var("SUITERUN_SUITES") {
            config.selection_mut().suites = Some(ListValue::Joined(suites));
        }
        if let Ok(tests) = env::var("SUITERUN_TESTS") {
            config.selection_mut().tests = Some(ListValue::Joined(tests));
        }
        if let Ok(tags) = env::var("SUITERUN_TAGS_TO_INCLUDE") {
            config.selection_mut().tags_to_include = Some(ListValue::Joined(tags));
        }
        if let Ok(tags) = env::var("SUITERUN_TAGS_TO_EXCLUDE") {
            config.selection_mut().tags_to_exclude = Some(ListValue::Joined(tags));
        }
        if let Ok(parallel) = env::var("SUITERUN_PARALLEL") {
            config.selection_mut().parallel = Some(parse_bool(&parallel));
        }
        if let Ok(factor) = env::var("SUITERUN_SPAN_SCALE_FACTOR") {
            let factor = factor.trim().parse::<f64>().map_err(|e| {
                ConfigError::invalid_value(
                    "SUITERUN_SPAN_SCALE_FACTOR",
                    format!("'{}': {}", factor, e),
                )
            })?;
            config.selection_mut().span_scale_factor = Some(factor);
        }

        if let Ok(debug) = env::var("SUITERUN_DEBUG") {
            config.debug_mut().enabled = Some(parse_bool(&debug));
        }

        config.validate()?;
        Ok(config)
    }

}

/// Resolve a path-list entry against the project root; URLs are kept as given
fn rooted_entry(root: &Path, entry: &str) -> String {
    if entry.contains("://") {
        entry.to_string()
    } else {
        root.join(entry).display().to_string()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

impl Config {
    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if a suiterun.toml was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Directory relative paths resolve against
    pub fn root_dir(&self) -> &Path {
        self.project_root().unwrap_or(&self.start_dir)
    }

    /// Apply CLI overrides (highest precedence)
    pub fn apply_overrides(&mut self, overrides: &ProjectConfig) -> ConfigResult<()> {
        self.project.merge(overrides);
        self.project.validate()
    }

    /// Resolve the merged sources into one immutable [`Configuration`]
    pub fn resolve(&self) -> ConfigResult<Configuration> {
        let root = self.root_dir();
        let paths = self.project.paths.clone().unwrap_or_default();
        let selection = self.project.selection.clone().unwrap_or_default();
        let fork = self.project.fork.clone().unwrap_or_default();
        let debug = self.project.debug.clone().unwrap_or_default();
        let in_process = self.project.in_process.clone().unwrap_or_default();

        let output_dir = root.join(
            paths
                .output
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        );
        let test_output_dir = root.join(
            paths
                .test_output
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TEST_OUTPUT_DIR)),
        );

        let joined = |value: Option<ListValue>| value.map(|v| v.to_comma_separated());
        let rooted = |value: Option<ListValue>| {
            value.map(|v| {
                v.entries()
                    .iter()
                    .map(|entry| rooted_entry(root, entry))
                    .collect::<Vec<_>>()
                    .join(",")
            })
        };

        Ok(Configuration {
            base_dir: root.to_path_buf(),
            output_dir,
            test_output_dir,
            classpath: paths
                .classpath
                .map(|c| c.entries().into_iter().map(|e| root.join(e)).collect())
                .unwrap_or_default(),
            runpath: rooted(paths.runpath),
            suites: joined(selection.suites),
            tests: joined(selection.tests),
            suffixes: joined(selection.suffixes),
            tags_to_include: joined(selection.tags_to_include),
            tags_to_exclude: joined(selection.tags_to_exclude),
            config: selection.config,
            parallel: selection.parallel.unwrap_or(false),
            members_only_suites: joined(selection.members_only_suites),
            wildcard_suites: joined(selection.wildcard_suites),
            testng_config_files: rooted(selection.testng_config_files),
            memory_files: rooted(selection.memory_files),
            tests_files: rooted(selection.tests_files),
            span_scale_factor: selection
                .span_scale_factor
                .unwrap_or(NEUTRAL_SPAN_SCALE_FACTOR),
            fork_mode: fork
                .mode
                .as_deref()
                .map(ForkMode::from_setting)
                .unwrap_or_default(),
            java: fork
                .java
                .or_else(|| self.global.default_java().map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_JAVA)),
            runner: fork.runner.unwrap_or_else(|| DEFAULT_RUNNER.to_string()),
            verifier: fork
                .verifier
                .unwrap_or_else(|| DEFAULT_VERIFIER.to_string()),
            arg_line: fork.arg_line,
            environment_variables: fork.environment,
            system_properties: fork.system_properties,
            debug_forked_process: debug.enabled.unwrap_or(false),
            debug_arg_line: debug.arg_line,
            debugger_port: debug
                .port
                .or_else(|| self.global.default_debugger_port())
                .unwrap_or(DEFAULT_DEBUGGER_PORT),
            timeout_secs: fork.timeout.unwrap_or(0),
            log_forked_process_command: fork
                .log_command
                .or_else(|| self.global.default_log_command())
                .unwrap_or(false),
            continue_on_failure: fork.continue_on_failure.unwrap_or(false),
            in_process_library: in_process
                .library
                .unwrap_or_else(|| DEFAULT_IN_PROCESS_LIBRARY.to_string()),
            in_process_symbol: in_process
                .symbol
                .unwrap_or_else(|| DEFAULT_IN_PROCESS_SYMBOL.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(PROJECT_CONFIG_FILE);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    fn loader(dir: &TempDir) -> ConfigLoader {
        ConfigLoader::new().with_global_config_path(dir.path().join("no-global.toml"))
    }

    #[test]
    #[serial]
    fn test_load_project_config() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[selection]
suites = "FooSuite"
"#,
        );

        let config = loader(&temp_dir)
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert!(config.is_project());
        assert_eq!(
            config.resolve().unwrap().suites.as_deref(),
            Some("FooSuite")
        );
    }

    #[test]
    #[serial]
    fn test_find_config_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[fork]\nmode = \"never\"\n");

        let sub_dir = temp_dir.path().join("subdir");
        fs::create_dir(&sub_dir).unwrap();

        let config = loader(&temp_dir).load_from_directory(&sub_dir).unwrap();

        assert_eq!(config.project_root(), Some(temp_dir.path()));
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.fork_mode, ForkMode::InProcess);
        assert_eq!(resolved.base_dir, temp_dir.path());
        assert_eq!(
            resolved.test_output_dir,
            temp_dir.path().join("target/test-classes")
        );
    }

    #[test]
    #[serial]
    fn test_no_project_config_uses_start_dir() {
        let temp_dir = TempDir::new().unwrap();

        let config = loader(&temp_dir)
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert!(!config.is_project());
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.output_dir, temp_dir.path().join("target/classes"));
        assert_eq!(resolved.fork_mode, ForkMode::Once);
        assert_eq!(resolved.debugger_port, DEFAULT_DEBUGGER_PORT);
    }

    #[test]
    #[serial]
    fn test_env_override_fork_mode() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[fork]\nmode = \"once\"\n");

        env::set_var("SUITERUN_FORK_MODE", "suite-sequential");
        let config = loader(&temp_dir).load_from_directory(temp_dir.path());
        env::remove_var("SUITERUN_FORK_MODE");

        assert_eq!(config.unwrap().resolve().unwrap().fork_mode, ForkMode::PerSuite);
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_timeout() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var("SUITERUN_TIMEOUT", "soon");
        let result = loader(&temp_dir).load_from_directory(temp_dir.path());
        env::remove_var("SUITERUN_TIMEOUT");

        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    #[serial]
    fn test_global_defaults_apply_under_project() {
        let temp_dir = TempDir::new().unwrap();
        let global_path = temp_dir.path().join("global.toml");
        fs::write(
            &global_path,
            "[defaults]\njava = \"/opt/java\"\ndebugger-port = 9000\n",
        )
        .unwrap();
        create_config_file(temp_dir.path(), "[debug]\nport = 7000\n");

        let config = ConfigLoader::new()
            .with_global_config_path(&global_path)
            .load_from_directory(temp_dir.path())
            .unwrap();
        let resolved = config.resolve().unwrap();

        assert_eq!(resolved.java, PathBuf::from("/opt/java"));
        assert_eq!(resolved.debugger_port, 7000);
    }

    #[test]
    #[serial]
    fn test_cli_overrides_win() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[selection]\ntests = \"a\"\n");

        let mut config = loader(&temp_dir)
            .load_from_directory(temp_dir.path())
            .unwrap();
        let mut overrides = ProjectConfig::default();
        overrides.selection_mut().tests = Some(ListValue::from("b"));
        config.apply_overrides(&overrides).unwrap();

        assert_eq!(config.resolve().unwrap().tests.as_deref(), Some("b"));
    }
}
