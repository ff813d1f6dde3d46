//! Test tool argument vector
//!
//! [`ArgumentBuilder::build`] maps a [`Configuration`] onto the runner's
//! command line. Fields are emitted in a fixed order: runpath, config
//! parameters, tags to include, tags to exclude, parallel, tests, suites,
//! suffixes, members-only suites, wildcard suites, TestNG config files,
//! memory files, tests files, span scale factor. Absent fields emit nothing.

use crate::selector::{SuiteSelector, TestSelector};
use std::path::Path;
use suiterun_config::configuration::NEUTRAL_SPAN_SCALE_FACTOR;
use suiterun_config::Configuration;

/// Builds runner arguments from a configuration
#[derive(Debug, Clone, Copy)]
pub struct ArgumentBuilder<'a> {
    config: &'a Configuration,
}

impl<'a> ArgumentBuilder<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    /// Build the full argument vector
    pub fn build(&self) -> Vec<String> {
        let mut args = Vec::new();
        args.extend(self.runpath());
        args.extend(self.config_params());
        args.extend(compound_arg("-n", self.config.tags_to_include.as_deref()));
        args.extend(compound_arg("-l", self.config.tags_to_exclude.as_deref()));
        args.extend(self.parallel());
        args.extend(self.tests());
        args.extend(self.suites());
        args.extend(repeated_arg("-q", self.config.suffixes.as_deref()));
        args.extend(repeated_arg(
            "-m",
            self.config.members_only_suites.as_deref(),
        ));
        args.extend(repeated_arg("-w", self.config.wildcard_suites.as_deref()));
        args.extend(repeated_arg(
            "-b",
            self.config.testng_config_files.as_deref(),
        ));
        args.extend(repeated_arg("-M", self.config.memory_files.as_deref()));
        args.extend(self.tests_files());
        args.extend(self.span_scale_factor());
        args
    }

    /// `-R "<main> <test> <extra>..."`
    fn runpath(&self) -> Vec<String> {
        let mut entries = vec![
            self.config.output_dir.display().to_string(),
            self.config.test_output_dir.display().to_string(),
        ];
        entries.extend(split_on_comma(self.config.runpath.as_deref()));
        vec!["-R".to_string(), entries.join(" ")]
    }

    fn config_params(&self) -> Vec<String> {
        self.config
            .config
            .iter()
            .map(|(key, value)| format!("-D{}={}", key, value))
            .collect()
    }

    fn parallel(&self) -> Vec<String> {
        if self.config.parallel {
            vec!["-P".to_string()]
        } else {
            Vec::new()
        }
    }

    fn tests(&self) -> Vec<String> {
        split_on_comma(self.config.tests.as_deref())
            .iter()
            .filter_map(|test| TestSelector::parse(test))
            .flat_map(|test| test.to_args())
            .collect()
    }

    fn suites(&self) -> Vec<String> {
        split_on_comma(self.config.suites.as_deref())
            .iter()
            .filter_map(|suite| SuiteSelector::parse(suite))
            .flat_map(|suite| suite.to_args())
            .collect()
    }

    /// `-A <file>` for each listed file that exists
    fn tests_files(&self) -> Vec<String> {
        let mut args = Vec::new();
        for file in split_on_comma(self.config.tests_files.as_deref()) {
            if Path::new(&file).exists() {
                args.push("-A".to_string());
                args.push(file);
            } else {
                tracing::debug!(file = %file, "skipping missing tests file");
            }
        }
        args
    }

    fn span_scale_factor(&self) -> Vec<String> {
        let factor = self.config.span_scale_factor;
        if factor == NEUTRAL_SPAN_SCALE_FACTOR {
            Vec::new()
        } else {
            vec!["-F".to_string(), format!("{:?}", factor)]
        }
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones
pub fn split_on_comma(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// One flag followed by every entry joined with spaces; nothing when empty
fn compound_arg(flag: &str, value: Option<&str>) -> Vec<String> {
    let entries = split_on_comma(value);
    if entries.is_empty() {
        Vec::new()
    } else {
        vec![flag.to_string(), entries.join(" ")]
    }
}

/// The flag repeated before each entry
fn repeated_arg(flag: &str, value: Option<&str>) -> Vec<String> {
    split_on_comma(value)
        .into_iter()
        .flat_map(|entry| [flag.to_string(), entry])
        .collect()
}
