//! Resolved run configuration
//!
//! [`Configuration`] is built once (by [`crate::Config::resolve`] or directly)
//! and passed by reference to every component. List-valued selection fields
//! keep their comma-separated form; `None` means the field was not set and
//! produces no test tool argument.

use crate::ForkMode;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Runner entry point of the test tool
pub const DEFAULT_RUNNER: &str = "org.scalatest.tools.Runner";
/// Helper program answering "is this class a suite?"
pub const DEFAULT_VERIFIER: &str = "com.diehl.scalatest.forkTools.IsClassATestSuite";
/// Program used for forked processes
pub const DEFAULT_JAVA: &str = "java";
/// Remote debugger port for forked processes
pub const DEFAULT_DEBUGGER_PORT: u16 = 5005;
/// Library searched on the test classpath for in-process runs
pub const DEFAULT_IN_PROCESS_LIBRARY: &str = "scalatest_runner";
/// Symbol exported by the in-process library
pub const DEFAULT_IN_PROCESS_SYMBOL: &str = "suiterun_run";
/// Span scale factor that leaves the tool's timing untouched
pub const NEUTRAL_SPAN_SCALE_FACTOR: f64 = 1.0;
/// Default compiled main output, relative to the project root
pub const DEFAULT_OUTPUT_DIR: &str = "target/classes";
/// Default compiled test output, relative to the project root
pub const DEFAULT_TEST_OUTPUT_DIR: &str = "target/test-classes";

/// Immutable description of one test run
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// Working directory for forked processes
    pub base_dir: PathBuf,
    /// Compiled main output (always on the runpath)
    pub output_dir: PathBuf,
    /// Compiled test output (always on the runpath, discovery root)
    pub test_output_dir: PathBuf,
    /// Extra test classpath elements
    pub classpath: Vec<PathBuf>,

    /// Extra runpath elements, comma separated
    pub runpath: Option<String>,
    /// Suite selectors, comma separated
    pub suites: Option<String>,
    /// Test selectors, comma separated
    pub tests: Option<String>,
    /// Suite suffix filters, comma separated
    pub suffixes: Option<String>,
    /// Tags to include, comma separated
    pub tags_to_include: Option<String>,
    /// Tags to exclude, comma separated
    pub tags_to_exclude: Option<String>,
    /// Config parameters passed to the tool
    pub config: BTreeMap<String, String>,
    /// Run suites concurrently inside the tool
    pub parallel: bool,
    /// Packages whose direct members are run, comma separated
    pub members_only_suites: Option<String>,
    /// Packages whose members are run recursively, comma separated
    pub wildcard_suites: Option<String>,
    /// TestNG XML config files, comma separated
    pub testng_config_files: Option<String>,
    /// Files receiving failed and canceled test names, comma separated
    pub memory_files: Option<String>,
    /// Files listing tests to rerun, comma separated
    pub tests_files: Option<String>,
    /// Multiplier for the tool's timing thresholds
    pub span_scale_factor: f64,

    /// Process strategy
    pub fork_mode: ForkMode,
    /// Program used for forked processes
    pub java: PathBuf,
    /// Runner entry point of the test tool
    pub runner: String,
    /// Suite verifier entry point
    pub verifier: String,
    /// Extra arguments for forked processes
    pub arg_line: Option<String>,
    /// Environment variables for forked processes
    pub environment_variables: BTreeMap<String, String>,
    /// System properties for forked processes
    pub system_properties: BTreeMap<String, String>,
    /// Suspend forked processes until a debugger attaches
    pub debug_forked_process: bool,
    /// Replacement for the default debug arguments
    pub debug_arg_line: Option<String>,
    /// Port for the default debug arguments
    pub debugger_port: u16,
    /// Seconds before a forked process is killed (0 = never)
    pub timeout_secs: u64,
    /// Log forked commands at info instead of debug
    pub log_forked_process_command: bool,
    /// Keep launching suites after one fails
    pub continue_on_failure: bool,

    /// Library providing the in-process entry point
    pub in_process_library: String,
    /// Symbol exported by the in-process library
    pub in_process_symbol: String,
}

impl Configuration {
    /// Create a configuration with every optional field absent
    pub fn new(output_dir: impl Into<PathBuf>, test_output_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: PathBuf::from("."),
            output_dir: output_dir.into(),
            test_output_dir: test_output_dir.into(),
            classpath: Vec::new(),
            runpath: None,
            suites: None,
            tests: None,
            suffixes: None,
            tags_to_include: None,
            tags_to_exclude: None,
            config: BTreeMap::new(),
            parallel: false,
            members_only_suites: None,
            wildcard_suites: None,
            testng_config_files: None,
            memory_files: None,
            tests_files: None,
            span_scale_factor: NEUTRAL_SPAN_SCALE_FACTOR,
            fork_mode: ForkMode::default(),
            java: PathBuf::from(DEFAULT_JAVA),
            runner: DEFAULT_RUNNER.to_string(),
            verifier: DEFAULT_VERIFIER.to_string(),
            arg_line: None,
            environment_variables: BTreeMap::new(),
            system_properties: BTreeMap::new(),
            debug_forked_process: false,
            debug_arg_line: None,
            debugger_port: DEFAULT_DEBUGGER_PORT,
            timeout_secs: 0,
            log_forked_process_command: false,
            continue_on_failure: false,
            in_process_library: DEFAULT_IN_PROCESS_LIBRARY.to_string(),
            in_process_symbol: DEFAULT_IN_PROCESS_SYMBOL.to_string(),
        }
    }

    /// Set the working directory for forked processes
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Test classpath: test output, main output, then the extra elements
    pub fn test_classpath(&self) -> Vec<PathBuf> {
        let mut elements = Vec::with_capacity(self.classpath.len() + 2);
        elements.push(self.test_output_dir.clone());
        elements.push(self.output_dir.clone());
        elements.extend(self.classpath.iter().cloned());
        elements
    }
}
