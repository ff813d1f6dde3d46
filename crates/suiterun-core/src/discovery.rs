//! Test class discovery - derive class names from compiled output

use crate::error::{RunError, RunResult};
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::Path;
use walkdir::WalkDir;

/// Compiled class file extension
pub const CLASS_EXTENSION: &str = "class";

/// Nested and anonymous class marker
pub const NESTED_CLASS_MARKER: char = '$';

/// Discover every class under `root`, deduplicated and sorted
///
/// `com/acme/FooSuite$Inner.class` becomes `com.acme.FooSuite`. A missing
/// root yields no classes.
pub fn discover(root: &Path) -> RunResult<Vec<String>> {
    if !root.exists() {
        tracing::debug!(root = %root.display(), "test output root does not exist");
        return Ok(Vec::new());
    }

    let mut classes = BTreeSet::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| RunError::discovery(root, e))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension() != Some(OsStr::new(CLASS_EXTENSION)) {
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .map_err(|e| RunError::discovery(root, e))?;

        if let Some(name) = class_name(relative) {
            classes.insert(name);
        }
    }

    tracing::debug!(count = classes.len(), root = %root.display(), "discovered classes");
    Ok(classes.into_iter().collect())
}

/// Qualified class name for a class file path relative to the output root
fn class_name(relative: &Path) -> Option<String> {
    let qualified = relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(".");

    let name = match qualified.find(NESTED_CLASS_MARKER) {
        Some(index) => &qualified[..index],
        None => qualified.as_str(),
    };

    let name = name.trim_end_matches('.');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
