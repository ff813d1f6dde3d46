//! In-process test runner entry point
//!
//! The runner is a dynamic library found on the test classpath
//! (`lib<name>.so`, `lib<name>.dylib`, `<name>.dll`) exporting
//!
//! ```c
//! int suiterun_run(const char *const *argv, size_t argc);
//! ```
//!
//! which returns 1 when every test passed, 0 when some failed, and any other
//! value when the run could not be carried out.

use crate::error::{RunError, RunResult};
use libloading::Library;
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::path::PathBuf;
use suiterun_config::Configuration;

/// Signature of the exported entry point
pub type RawEntryPoint = unsafe extern "C" fn(argv: *const *const c_char, argc: usize) -> c_int;

/// A test runner callable with an argument vector
pub trait TestEntryPoint {
    /// Run the tests; `Ok(true)` when all passed
    fn run(&self, args: &[String]) -> RunResult<bool>;
}

/// Finds the entry point for a configuration, once per run
pub trait EntryPointResolver {
    fn resolve(&self, config: &Configuration) -> RunResult<Box<dyn TestEntryPoint>>;
}

/// Entry point exported by a loaded library
pub struct NativeEntryPoint {
    run: RawEntryPoint,
    // Keeps `run` valid.
    _library: Library,
}

impl TestEntryPoint for NativeEntryPoint {
    fn run(&self, args: &[String]) -> RunResult<bool> {
        invoke(self.run, args)
    }
}

fn invoke(run: RawEntryPoint, args: &[String]) -> RunResult<bool> {
    let owned = args
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| RunError::Invocation(format!("argument contains a NUL byte: {}", e)))?;
    let argv: Vec<*const c_char> = owned.iter().map(|arg| arg.as_ptr()).collect();

    // SAFETY: argv holds argc pointers to NUL-terminated strings that outlive the call.
    let code = unsafe { run(argv.as_ptr(), argv.len()) };

    match code {
        1 => Ok(true),
        0 => Ok(false),
        other => Err(RunError::Invocation(format!(
            "entry point returned unexpected status {}",
            other
        ))),
    }
}

/// Loads the entry point library from the test classpath
#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryResolver;

impl LibraryResolver {
    pub fn new() -> Self {
        Self
    }

    /// Platform file names for a library name, in priority order
    fn candidate_names(name: &str) -> Vec<String> {
        let extensions: &[&str] = if cfg!(target_os = "windows") {
            &["dll"]
        } else if cfg!(target_os = "macos") {
            &["dylib", "so"]
        } else {
            &["so"]
        };
        let prefixes: &[&str] = if cfg!(target_os = "windows") {
            &["", "lib"]
        } else {
            &["lib", ""]
        };

        let mut names = Vec::new();
        for prefix in prefixes {
            for ext in extensions {
                names.push(format!("{}{}.{}", prefix, name, ext));
            }
        }
        names
    }

    /// Find the library on the classpath
    ///
    /// Directory elements are searched for the platform file names; file
    /// elements match when their file name is one of them.
    pub fn find_library(name: &str, classpath: &[PathBuf]) -> Option<PathBuf> {
        let candidates = Self::candidate_names(name);

        for element in classpath {
            if element.is_dir() {
                for candidate in &candidates {
                    let path = element.join(candidate);
                    if path.is_file() {
                        return Some(path);
                    }
                }
            } else if element.is_file() {
                let matches = element
                    .file_name()
                    .and_then(|f| f.to_str())
                    .map_or(false, |f| candidates.iter().any(|c| c == f));
                if matches {
                    return Some(element.clone());
                }
            }
        }

        None
    }
}

impl EntryPointResolver for LibraryResolver {
    fn resolve(&self, config: &Configuration) -> RunResult<Box<dyn TestEntryPoint>> {
        let name = &config.in_process_library;
        let symbol = &config.in_process_symbol;

        let path = Self::find_library(name, &config.test_classpath()).ok_or_else(|| {
            RunError::DependencyMissing(format!("library '{}' not found on test classpath", name))
        })?;

        tracing::debug!(library = %path.display(), symbol = %symbol, "loading in-process runner");

        // SAFETY: loading runs the library's initialisers; the library comes
        // from the project's own test classpath.
        let library = unsafe { Library::new(&path) }.map_err(|e| {
            RunError::DependencyMissing(format!("failed to load {}: {}", path.display(), e))
        })?;

        // SAFETY: the exported symbol is required to have the RawEntryPoint signature.
        let run: RawEntryPoint = unsafe {
            *library
                .get::<RawEntryPoint>(symbol.as_bytes())
                .map_err(|_| {
                    RunError::DependencyMissing(format!(
                        "symbol '{}' not found in {}",
                        symbol,
                        path.display()
                    ))
                })?
        };

        Ok(Box::new(NativeEntryPoint {
            run,
            _library: library,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;
    use std::fs;
    use tempfile::TempDir;

    unsafe extern "C" fn passes_when_suite_given(argv: *const *const c_char, argc: usize) -> c_int {
        let args = std::slice::from_raw_parts(argv, argc);
        let has_suite = args
            .iter()
            .any(|&arg| CStr::from_ptr(arg).to_bytes() == b"-s");
        c_int::from(has_suite)
    }

    unsafe extern "C" fn broken(_argv: *const *const c_char, _argc: usize) -> c_int {
        -1
    }

    #[test]
    fn test_invoke_maps_status() {
        let with_suite = vec!["-s".to_string(), "FooSuite".to_string()];
        assert!(invoke(passes_when_suite_given, &with_suite).unwrap());
        assert!(!invoke(passes_when_suite_given, &["-P".to_string()]).unwrap());
    }

    #[test]
    fn test_invoke_unexpected_status_is_invocation_error() {
        let err = invoke(broken, &[]).unwrap_err();
        assert!(matches!(err, RunError::Invocation(_)));
    }

    #[test]
    fn test_invoke_rejects_nul_bytes() {
        let err = invoke(broken, &["a\0b".to_string()]).unwrap_err();
        assert!(matches!(err, RunError::Invocation(_)));
    }

    #[test]
    fn test_find_library_in_classpath_directory() {
        let temp = TempDir::new().unwrap();
        let file_name = &LibraryResolver::candidate_names("runner")[0];
        fs::write(temp.path().join(file_name), b"").unwrap();

        let classpath = vec![temp.path().join("absent"), temp.path().to_path_buf()];
        assert_eq!(
            LibraryResolver::find_library("runner", &classpath),
            Some(temp.path().join(file_name))
        );
        assert_eq!(LibraryResolver::find_library("other", &classpath), None);
    }

    #[test]
    fn test_find_library_as_classpath_file() {
        let temp = TempDir::new().unwrap();
        let file = temp
            .path()
            .join(&LibraryResolver::candidate_names("runner")[0]);
        fs::write(&file, b"").unwrap();

        assert_eq!(
            LibraryResolver::find_library("runner", &[file.clone()]),
            Some(file)
        );
    }

    #[test]
    fn test_missing_library_is_dependency_missing() {
        let temp = TempDir::new().unwrap();
        let config = Configuration::new(temp.path().join("main"), temp.path().join("test"));

        let err = LibraryResolver::new().resolve(&config).err().unwrap();
        assert!(matches!(err, RunError::DependencyMissing(_)));
    }

    #[test]
    fn test_unloadable_library_is_dependency_missing() {
        let temp = TempDir::new().unwrap();
        let test_dir = temp.path().join("test");
        fs::create_dir_all(&test_dir).unwrap();
        fs::write(
            test_dir.join(&LibraryResolver::candidate_names("scalatest_runner")[0]),
            b"not a shared object",
        )
        .unwrap();
        let config = Configuration::new(temp.path().join("main"), &test_dir);

        let err = LibraryResolver::new().resolve(&config).err().unwrap();
        assert!(matches!(err, RunError::DependencyMissing(ref m) if m.contains("failed to load")));
    }
}
