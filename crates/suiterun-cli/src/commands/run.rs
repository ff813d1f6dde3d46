//! Run command - execute the configured tests

use crate::config::{self, OverrideArgs, ProjectArgs};
use anyhow::Result;
use suiterun_core::{
    LibraryResolver, RunOutcome, StdoutSink, SystemLauncher, TestRunner,
};

/// Arguments for the run command
#[derive(Debug, Default)]
pub struct RunArgs {
    pub project: ProjectArgs,
    pub overrides: OverrideArgs,
    /// Suppress the summary line
    pub quiet: bool,
}

/// Run the tests; `Ok(false)` when some failed
pub fn run(args: RunArgs) -> Result<bool> {
    let configuration = config::load(&args.project, &args.overrides)?;

    let launcher = SystemLauncher::new();
    let resolver = LibraryResolver::new();
    let runner = TestRunner::new(&configuration, &launcher, &resolver);
    let strategy = runner.strategy();

    let outcome = runner.run(&mut StdoutSink)?;

    if !args.quiet {
        println!("{}", summary(&outcome, &strategy.to_string()));
    }
    Ok(outcome.passed())
}

/// One-line result for the end of a run
fn summary(outcome: &RunOutcome, strategy: &str) -> String {
    let mut details = vec![strategy.to_string()];
    if outcome.launches > 0 {
        details.push(format!(
            "{} process{} launched",
            outcome.launches,
            if outcome.launches == 1 { "" } else { "es" }
        ));
    }
    if !outcome.skipped.is_empty() {
        details.push(format!("{} non-suite classes skipped", outcome.skipped.len()));
    }

    match outcome.first_failure() {
        None => format!("Tests passed ({})", details.join(", ")),
        Some(failure) => format!("Tests failed: {} ({})", failure, details.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use suiterun_core::SuiteFailure;

    #[test]
    fn test_summary_passed() {
        let outcome = RunOutcome {
            launches: 1,
            ..Default::default()
        };
        assert_eq!(
            summary(&outcome, "fork-once"),
            "Tests passed (fork-once, 1 process launched)"
        );
    }

    #[test]
    fn test_summary_failed_suite() {
        let outcome = RunOutcome {
            launches: 2,
            skipped: vec!["Helper".to_string()],
            failures: vec![SuiteFailure {
                suite: Some("BSuite".to_string()),
                exit_code: Some(1),
            }],
        };
        assert_eq!(
            summary(&outcome, "fork-per-suite"),
            "Tests failed: suite BSuite exited with code 1 (fork-per-suite, 2 processes launched, 1 non-suite classes skipped)"
        );
    }

    #[test]
    fn test_summary_in_process() {
        assert_eq!(
            summary(&RunOutcome::default(), "in-process"),
            "Tests passed (in-process)"
        );
    }
}
