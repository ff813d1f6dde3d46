/// Test run error types
use std::path::PathBuf;
use thiserror::Error;

pub type RunResult<T> = Result<T, RunError>;

/// Fatal failures of a test run
///
/// A failing test is not an error: it is reported through
/// [`crate::RunOutcome::passed`]. Every variant here aborts the run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Test tool dependency missing from classpath: {0}")]
    DependencyMissing(String),

    #[error("Failed to invoke the in-process test runner: {0}")]
    Invocation(String),

    #[error("Failed to launch '{program}': {error}")]
    Launch {
        program: String,
        error: std::io::Error,
    },

    #[error(
        "Timed out after {seconds} seconds waiting for forked process to complete.{}",
        running_suite(.suite)
    )]
    Timeout {
        seconds: u64,
        suite: Option<String>,
    },

    #[error("Failed to classify class '{class}': {reason}")]
    Classification { class: String, reason: String },

    #[error("Failed to discover test classes under {root}: {error}")]
    Discovery { root: PathBuf, error: String },

    #[error("Invalid classpath: {0}")]
    InvalidClasspath(String),
}

impl RunError {
    /// Create a launch error
    pub fn launch(program: impl Into<String>, error: std::io::Error) -> Self {
        Self::Launch {
            program: program.into(),
            error,
        }
    }

    /// Create a timeout error
    pub fn timeout(seconds: u64, suite: Option<String>) -> Self {
        Self::Timeout { seconds, suite }
    }

    /// Create a classification error
    pub fn classification(class: impl Into<String>, reason: impl ToString) -> Self {
        Self::Classification {
            class: class.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a discovery error
    pub fn discovery(root: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::Discovery {
            root: root.into(),
            error: error.to_string(),
        }
    }

    /// Suite that was running when the error occurred, if known
    pub fn suite(&self) -> Option<&str> {
        match self {
            Self::Timeout { suite, .. } => suite.as_deref(),
            Self::Classification { class, .. } => Some(class),
            _ => None,
        }
    }
}

fn running_suite(suite: &Option<String>) -> String {
    suite
        .as_deref()
        .map(|suite| format!(" Suite: {}", suite))
        .unwrap_or_default()
}
