//! suiterun core
//!
//! Turns a [`Configuration`] into a test runner invocation and carries it out:
//! - Argument vector construction ([`ArgumentBuilder`])
//! - Test class discovery and suite verification
//! - Forked process launching with timeout and output streaming
//! - In-process, fork-once and fork-per-suite execution strategies

pub mod args;
pub mod classifier;
pub mod discovery;
pub mod entry_point;
pub mod error;
pub mod launcher;
pub mod selector;
pub mod strategy;

// Re-export main types
pub use args::{split_on_comma, ArgumentBuilder};
pub use classifier::{SuiteClassifier, VerifierClassifier};
pub use discovery::discover;
pub use entry_point::{EntryPointResolver, LibraryResolver, NativeEntryPoint, TestEntryPoint};
pub use error::{RunError, RunResult};
pub use launcher::{
    LaunchRequest, OutputSink, ProcessLauncher, ProcessResult, StdoutSink, SystemLauncher,
};
pub use selector::{SuiteSelector, TestSelector};
pub use strategy::{ExecutionStrategy, RunOutcome, SuiteFailure, TestRunner};

pub use suiterun_config::Configuration;

/// Run with real processes, the classpath library resolver and stdout output
pub fn run(config: &Configuration) -> RunResult<RunOutcome> {
    let launcher = SystemLauncher::new();
    let resolver = LibraryResolver::new();
    TestRunner::new(config, &launcher, &resolver).run(&mut StdoutSink)
}
