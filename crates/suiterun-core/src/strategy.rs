//! Execution strategies
//!
//! The [`TestRunner`] builds the argument vector once and then either calls
//! the in-process entry point, forks one runner process for everything, or
//! forks one runner process per discovered suite class. Suites run one at a
//! time; by default the first failing suite stops the run.

use crate::args::ArgumentBuilder;
use crate::classifier::{SuiteClassifier, VerifierClassifier};
use crate::discovery::discover;
use crate::entry_point::EntryPointResolver;
use crate::error::{RunError, RunResult};
use crate::launcher::{LaunchRequest, OutputSink, ProcessLauncher};
use std::fmt;
use suiterun_config::{Configuration, ForkMode};

/// How the tests of one run are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    InProcess,
    ForkOnce,
    ForkPerSuite,
}

impl From<ForkMode> for ExecutionStrategy {
    fn from(mode: ForkMode) -> Self {
        match mode {
            ForkMode::InProcess => Self::InProcess,
            ForkMode::Once => Self::ForkOnce,
            ForkMode::PerSuite => Self::ForkPerSuite,
        }
    }
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InProcess => "in-process",
            Self::ForkOnce => "fork-once",
            Self::ForkPerSuite => "fork-per-suite",
        };
        f.write_str(name)
    }
}

/// A failed run or suite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteFailure {
    /// Suite class, for per-suite runs
    pub suite: Option<String>,
    /// Exit code of the forked process; `None` in process
    pub exit_code: Option<i32>,
}

impl fmt::Display for SuiteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.suite, self.exit_code) {
            (Some(suite), Some(code)) => write!(f, "suite {} exited with code {}", suite, code),
            (Some(suite), None) => write!(f, "suite {} failed", suite),
            (None, Some(code)) => write!(f, "test process exited with code {}", code),
            (None, None) => f.write_str("tests failed"),
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    /// Forked runner processes started
    pub launches: usize,
    /// Classes the verifier rejected
    pub skipped: Vec<String>,
    /// Failures in launch order
    pub failures: Vec<SuiteFailure>,
}

impl RunOutcome {
    /// True when every test passed
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// First failure, if any
    pub fn first_failure(&self) -> Option<&SuiteFailure> {
        self.failures.first()
    }

    fn fail(&mut self, suite: Option<String>, exit_code: Option<i32>) {
        self.failures.push(SuiteFailure { suite, exit_code });
    }
}

/// Runs the tests described by a configuration
pub struct TestRunner<'a> {
    config: &'a Configuration,
    launcher: &'a dyn ProcessLauncher,
    resolver: &'a dyn EntryPointResolver,
    classifier: Option<&'a dyn SuiteClassifier>,
}

impl<'a> TestRunner<'a> {
    pub fn new(
        config: &'a Configuration,
        launcher: &'a dyn ProcessLauncher,
        resolver: &'a dyn EntryPointResolver,
    ) -> Self {
        Self {
            config,
            launcher,
            resolver,
            classifier: None,
        }
    }

    /// Use `classifier` instead of the verifier process
    pub fn with_classifier(mut self, classifier: &'a dyn SuiteClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Strategy selected by the configured fork mode
    pub fn strategy(&self) -> ExecutionStrategy {
        self.config.fork_mode.into()
    }

    /// Run the tests, forwarding process output to `sink`
    pub fn run(&self, sink: &mut dyn OutputSink) -> RunResult<RunOutcome> {
        let args = ArgumentBuilder::new(self.config).build();
        tracing::debug!(args = ?args, strategy = %self.strategy(), "running tests");

        match self.strategy() {
            ExecutionStrategy::InProcess => self.run_in_process(&args),
            ExecutionStrategy::ForkOnce => self.run_fork_once(&args, sink),
            ExecutionStrategy::ForkPerSuite => self.run_fork_per_suite(&args, sink),
        }
    }

    fn run_in_process(&self, args: &[String]) -> RunResult<RunOutcome> {
        let entry_point = self.resolver.resolve(self.config)?;

        let mut outcome = RunOutcome::default();
        if !entry_point.run(args)? {
            outcome.fail(None, None);
        }
        Ok(outcome)
    }

    fn run_fork_once(&self, args: &[String], sink: &mut dyn OutputSink) -> RunResult<RunOutcome> {
        let request = LaunchRequest::forked(self.config, args);
        self.log_command(&request, None);

        let result = self.launcher.launch(&request, sink)?;
        if result.timed_out {
            return Err(RunError::timeout(self.config.timeout_secs, None));
        }

        let mut outcome = RunOutcome {
            launches: 1,
            ..Default::default()
        };
        if !result.success() {
            outcome.fail(None, Some(result.exit_code));
        }
        Ok(outcome)
    }

    fn run_fork_per_suite(
        &self,
        args: &[String],
        sink: &mut dyn OutputSink,
    ) -> RunResult<RunOutcome> {
        let verifier = VerifierClassifier::new(self.config, self.launcher);
        let classifier: &dyn SuiteClassifier = match self.classifier {
            Some(classifier) => classifier,
            None => &verifier,
        };

        let classes = discover(&self.config.test_output_dir)?;
        let mut outcome = RunOutcome::default();

        for class in classes {
            if !classifier.is_suite(&class, sink)? {
                tracing::info!("Class {} doesn't appear to be a test suite. Skipping.", class);
                outcome.skipped.push(class);
                continue;
            }

            let request = LaunchRequest::forked(self.config, args).for_suite(&class);
            self.log_command(&request, Some(&class));

            let result = self.launcher.launch(&request, sink)?;
            outcome.launches += 1;

            if result.timed_out {
                return Err(RunError::timeout(self.config.timeout_secs, Some(class)));
            }
            if !result.success() {
                tracing::debug!(suite = %class, exit_code = result.exit_code, "suite failed");
                outcome.fail(Some(class), Some(result.exit_code));
                if !self.config.continue_on_failure {
                    break;
                }
            }
        }

        Ok(outcome)
    }

    fn log_command(&self, request: &LaunchRequest, suite: Option<&str>) {
        let command = request.command_line();
        let statement = match suite {
            Some(suite) => format!(
                "Forking test runner via: {} for possible test suite: {}",
                command, suite
            ),
            None => format!("Forking test runner via: {}", command),
        };

        if self.config.log_forked_process_command {
            tracing::info!("{}", statement);
        } else {
            tracing::debug!("{}", statement);
        }
    }
}
