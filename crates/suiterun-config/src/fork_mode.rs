//! Fork mode selection

use crate::ConfigError;
use std::fmt;
use std::str::FromStr;

/// How test processes are spawned for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForkMode {
    /// Run the test tool inside this process
    InProcess,
    /// One forked process covering every selected test
    #[default]
    Once,
    /// One forked process per discovered suite class, run sequentially
    PerSuite,
}

impl ForkMode {
    /// Canonical setting name
    pub fn name(&self) -> &'static str {
        match self {
            Self::InProcess => "never",
            Self::Once => "once",
            Self::PerSuite => "suite-sequential",
        }
    }

    /// Resolve a raw setting, falling back to [`ForkMode::Once`] with a warning
    /// when the value is not recognised.
    pub fn from_setting(value: &str) -> Self {
        match value.parse() {
            Ok(mode) => mode,
            Err(_) => {
                tracing::warn!(
                    fork_mode = value,
                    "Invalid fork mode \"{}\"; using once instead",
                    value
                );
                Self::Once
            }
        }
    }
}

impl FromStr for ForkMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "never" | "in-process" => Ok(Self::InProcess),
            "once" | "fork-once" => Ok(Self::Once),
            "suite-sequential" | "fork-per-suite" => Ok(Self::PerSuite),
            _ => Err(ConfigError::invalid_value(
                "fork.mode",
                format!(
                    "expected 'never', 'once' or 'suite-sequential', got '{}'",
                    s
                ),
            )),
        }
    }
}

impl fmt::Display for ForkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
