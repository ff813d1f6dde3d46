//! Suite classification through the verifier process

use crate::error::{RunError, RunResult};
use crate::launcher::{LaunchRequest, OutputSink, ProcessLauncher};
use suiterun_config::Configuration;

/// Decides whether a discovered class is a runnable suite
pub trait SuiteClassifier {
    fn is_suite(&self, class: &str, sink: &mut dyn OutputSink) -> RunResult<bool>;
}

/// Asks the verifier program: exit code 0 means the class is a suite
pub struct VerifierClassifier<'a> {
    config: &'a Configuration,
    launcher: &'a dyn ProcessLauncher,
}

impl<'a> VerifierClassifier<'a> {
    pub fn new(config: &'a Configuration, launcher: &'a dyn ProcessLauncher) -> Self {
        Self { config, launcher }
    }
}

impl SuiteClassifier for VerifierClassifier<'_> {
    fn is_suite(&self, class: &str, sink: &mut dyn OutputSink) -> RunResult<bool> {
        let request = LaunchRequest::verifier(self.config, class);
        tracing::trace!(command = %request.command_line(), "verifying suite");

        let result = self
            .launcher
            .launch(&request, sink)
            .map_err(|e| RunError::classification(class, e))?;

        Ok(result.success())
    }
}
