//! Configuration from the command line
//!
//! Flags are turned into a [`ProjectConfig`] overlay and merged on top of
//! the file and `SUITERUN_*` values, so a flag always wins.

use anyhow::{Context, Result};
use clap::Args;
use std::env;
use std::path::PathBuf;
use suiterun_config::{ConfigLoader, Configuration, ListValue, ProjectConfig};

/// Where to find the project
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Directory to search upwards from for suiterun.toml
    #[arg(long, short = 'd', value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Use this configuration file instead of searching
    #[arg(long, short = 'c', value_name = "FILE", env = "SUITERUN_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Per-run overrides of the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct OverrideArgs {
    /// never, once or suite-sequential
    #[arg(long, value_name = "MODE")]
    pub fork_mode: Option<String>,

    /// Comma-separated suites, each optionally followed by a test name
    #[arg(long, short = 's', value_name = "SUITES")]
    pub suites: Option<String>,

    /// Comma-separated test names ('@' prefix for an exact match)
    #[arg(long, short = 't', value_name = "TESTS")]
    pub tests: Option<String>,

    /// Comma-separated tags to include
    #[arg(long, value_name = "TAGS")]
    pub tags_to_include: Option<String>,

    /// Comma-separated tags to exclude
    #[arg(long, value_name = "TAGS")]
    pub tags_to_exclude: Option<String>,

    /// Run suites in parallel inside the test tool
    #[arg(long)]
    pub parallel: bool,

    /// Multiply the tool's timing thresholds
    #[arg(long, value_name = "FACTOR")]
    pub span_scale_factor: Option<f64>,

    /// Kill a forked process after this many seconds (0 = never)
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Suspend forked processes until a debugger attaches
    #[arg(long)]
    pub debug_forked_process: bool,

    /// Port for the debugger to attach to
    #[arg(long, value_name = "PORT")]
    pub debugger_port: Option<u16>,

    /// Log forked commands at info level
    #[arg(long)]
    pub log_command: bool,

    /// Keep running suites after one fails
    #[arg(long)]
    pub continue_on_failure: bool,

    /// Program used for forked processes
    #[arg(long, value_name = "PATH")]
    pub java: Option<PathBuf>,
}

impl OverrideArgs {
    /// Overlay holding only the flags that were given
    pub fn to_project_config(&self) -> ProjectConfig {
        let mut config = ProjectConfig::default();

        if let Some(mode) = &self.fork_mode {
            config.fork_mut().mode = Some(mode.clone());
        }
        if let Some(java) = &self.java {
            config.fork_mut().java = Some(java.clone());
        }
        if let Some(timeout) = self.timeout {
            config.fork_mut().timeout = Some(timeout);
        }
        if self.log_command {
            config.fork_mut().log_command = Some(true);
        }
        if self.continue_on_failure {
            config.fork_mut().continue_on_failure = Some(true);
        }

        if let Some(suites) = &self.suites {
            config.selection_mut().suites = Some(ListValue::from(suites.as_str()));
        }
        if let Some(tests) = &self.tests {
            config.selection_mut().tests = Some(ListValue::from(tests.as_str()));
        }
        if let Some(tags) = &self.tags_to_include {
            config.selection_mut().tags_to_include = Some(ListValue::from(tags.as_str()));
        }
        if let Some(tags) = &self.tags_to_exclude {
            config.selection_mut().tags_to_exclude = Some(ListValue::from(tags.as_str()));
        }
        if self.parallel {
            config.selection_mut().parallel = Some(true);
        }
        if let Some(factor) = self.span_scale_factor {
            config.selection_mut().span_scale_factor = Some(factor);
        }

        if self.debug_forked_process {
            config.debug_mut().enabled = Some(true);
        }
        if let Some(port) = self.debugger_port {
            config.debug_mut().port = Some(port);
        }

        config
    }
}

/// Load, merge and resolve the configuration for one command
pub fn load(project: &ProjectArgs, overrides: &OverrideArgs) -> Result<Configuration> {
    let mut loader = ConfigLoader::new();

    let mut config = match &project.config {
        Some(file) => loader
            .load_from_file(file)
            .with_context(|| format!("Failed to load {}", file.display()))?,
        None => {
            let cwd = env::current_dir().context("Failed to get current directory")?;
            let start = match &project.dir {
                Some(dir) => cwd.join(dir),
                None => cwd,
            };
            loader
                .load_from_directory(&start)
                .with_context(|| format!("Failed to load configuration from {}", start.display()))?
        }
    };

    config
        .apply_overrides(&overrides.to_project_config())
        .context("Invalid command-line override")?;

    let configuration = config.resolve().context("Failed to resolve configuration")?;
    tracing::debug!(
        root = %configuration.base_dir.display(),
        fork_mode = %configuration.fork_mode,
        "configuration loaded"
    );
    Ok(configuration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_overrides_change_nothing() {
        assert_eq!(
            OverrideArgs::default().to_project_config(),
            ProjectConfig::default()
        );
    }

    #[test]
    fn test_overrides_fill_sections() {
        let overrides = OverrideArgs {
            fork_mode: Some("never".to_string()),
            tests: Some("@exact".to_string()),
            debugger_port: Some(9000),
            continue_on_failure: true,
            ..Default::default()
        };
        let config = overrides.to_project_config();

        assert_eq!(config.fork.as_ref().unwrap().mode.as_deref(), Some("never"));
        assert_eq!(
            config.fork.as_ref().unwrap().continue_on_failure,
            Some(true)
        );
        assert_eq!(
            config.selection.as_ref().unwrap().tests,
            Some(ListValue::from("@exact"))
        );
        assert_eq!(config.debug.as_ref().unwrap().port, Some(9000));
        assert!(config.paths.is_none());
    }
}
