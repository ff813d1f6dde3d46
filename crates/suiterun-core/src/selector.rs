//! Suite and test selectors
//!
//! A test name prefixed with `@` selects one test exactly (`-t`); any other
//! name selects every test whose name contains it (`-z`). A suite selector is
//! a suite name optionally followed, after whitespace, by such a test name.

/// Marker that turns a test name into an exact match
pub const EXACT_MARKER: char = '@';

/// One test selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestSelector {
    /// Run the test with exactly this name
    Exact(String),
    /// Run every test whose name contains this text
    Substring(String),
}

impl TestSelector {
    /// Parse a test name; blank names and a bare `@` select nothing
    pub fn parse(raw: &str) -> Option<Self> {
        let test = raw.trim();
        if test.is_empty() {
            return None;
        }

        match test.strip_prefix(EXACT_MARKER) {
            Some(exact) => {
                let exact = exact.trim();
                if exact.is_empty() {
                    None
                } else {
                    Some(Self::Exact(exact.to_string()))
                }
            }
            None => Some(Self::Substring(test.to_string())),
        }
    }

    /// Selected name without the marker
    pub fn name(&self) -> &str {
        match self {
            Self::Exact(name) | Self::Substring(name) => name,
        }
    }

    /// Test tool flag for this kind of match
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Exact(_) => "-t",
            Self::Substring(_) => "-z",
        }
    }

    /// Flag and value
    pub fn to_args(&self) -> [String; 2] {
        [self.flag().to_string(), self.name().to_string()]
    }
}

/// A suite name with an optional test inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteSelector {
    pub suite: String,
    pub test: Option<TestSelector>,
}

impl SuiteSelector {
    /// Parse `"Suite"` or `"Suite test name"`; blank input selects nothing
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        match trimmed.split_once(char::is_whitespace) {
            Some((suite, rest)) => Some(Self {
                suite: suite.to_string(),
                test: TestSelector::parse(rest),
            }),
            None => Some(Self {
                suite: trimmed.to_string(),
                test: None,
            }),
        }
    }

    /// `-s <suite>`, followed by the test pair when present
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-s".to_string(), self.suite.clone()];
        if let Some(test) = &self.test {
            args.extend(test.to_args());
        }
        args
    }
}
