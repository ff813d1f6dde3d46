//! CLI integration tests
//!
//! Each test builds a throwaway project directory; `HOME` points into it so a
//! real ~/.suiterun/config.toml never leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn suiterun(project: &Path) -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("suiterun");
    cmd.current_dir(project)
        .env("HOME", project)
        .env_remove("RUST_LOG")
        .env_remove("SUITERUN_CONFIG")
        .env_remove("SUITERUN_FORK_MODE")
        .env_remove("SUITERUN_SUITES")
        .env_remove("SUITERUN_TESTS")
        .env_remove("SUITERUN_TIMEOUT")
        .env_remove("SUITERUN_JAVA");
    cmd
}

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"").unwrap();
}

fn stdout_of(cmd: &mut Command, root: &Path) -> String {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {:?}", output);
    String::from_utf8(output.stdout)
        .unwrap()
        .replace(&root.display().to_string(), "[ROOT]")
        .trim_end()
        .to_string()
}

// ══════════════════════════════════════════════════════════════════════════════
// HELP AND COMPLETIONS
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_help_shows_commands_and_examples() {
    let temp = TempDir::new().unwrap();
    suiterun(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("args"))
        .stdout(predicate::str::contains("discover"))
        .stdout(predicate::str::contains("completions"))
        .stdout(predicate::str::contains("EXAMPLES"));
}

#[test]
fn test_run_help_lists_overrides() {
    let temp = TempDir::new().unwrap();
    suiterun(temp.path())
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--fork-mode"))
        .stdout(predicate::str::contains("--span-scale-factor"))
        .stdout(predicate::str::contains("--continue-on-failure"));
}

#[test]
fn test_completions_bash() {
    let temp = TempDir::new().unwrap();
    suiterun(temp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("suiterun"));
}

// ══════════════════════════════════════════════════════════════════════════════
// ARGS
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_args_without_configuration() {
    let temp = TempDir::new().unwrap();
    let output = stdout_of(suiterun(temp.path()).arg("args"), temp.path());

    insta::assert_snapshot!(output, @r"
-R
[ROOT]/target/classes [ROOT]/target/test-classes
");
}

#[test]
fn test_args_from_file_and_flags() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("suiterun.toml"),
        r#"
[paths]
runpath = ["lib/extra.jar"]

[selection]
suites = ["FooSuite @exact name", "BarSuite"]
tags-to-exclude = "Slow,Flaky"
span-scale-factor = 2.0

[selection.config]
db = "mem"
"#,
    )
    .unwrap();

    let output = stdout_of(
        suiterun(temp.path()).args(["args", "--tests", "partial", "--parallel"]),
        temp.path(),
    );

    insta::assert_snapshot!(output, @r"
-R
[ROOT]/target/classes [ROOT]/target/test-classes [ROOT]/lib/extra.jar
-Ddb=mem
-l
Slow Flaky
-P
-z
partial
-s
FooSuite
-t
exact name
-s
BarSuite
-F
2.0
");
}

#[test]
fn test_args_json() {
    let temp = TempDir::new().unwrap();
    let output = stdout_of(
        suiterun(temp.path()).args(["args", "--json", "--suites", "FooSuite"]),
        temp.path(),
    );

    let tokens: Vec<String> = serde_json::from_str(&output).unwrap();
    assert_eq!(tokens[0], "-R");
    assert_eq!(&tokens[2..], ["-s", "FooSuite"]);
}

#[test]
fn test_args_found_from_subdirectory() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("suiterun.toml"),
        "[paths]\ntest-output = \"out/test\"\n",
    )
    .unwrap();
    fs::create_dir_all(temp.path().join("module/src")).unwrap();

    let output = stdout_of(
        suiterun(temp.path()).args(["args", "--dir", "module/src"]),
        temp.path(),
    );

    assert_eq!(
        output,
        "-R\n[ROOT]/target/classes [ROOT]/out/test"
    );
}

#[test]
fn test_tests_file_found_from_subdirectory() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("suiterun.toml"),
        "[selection]\ntests-files = \"rerun.txt, missing.txt\"\n",
    )
    .unwrap();
    fs::write(temp.path().join("rerun.txt"), "FooSuite\n").unwrap();
    fs::create_dir_all(temp.path().join("module")).unwrap();

    let output = stdout_of(
        suiterun(&temp.path().join("module")).arg("args"),
        temp.path(),
    );

    insta::assert_snapshot!(output, @r"
-R
[ROOT]/target/classes [ROOT]/target/test-classes
-A
[ROOT]/rerun.txt
");
}

#[test]
fn test_env_override_applies() {
    let temp = TempDir::new().unwrap();
    let output = stdout_of(
        suiterun(temp.path())
            .arg("args")
            .env("SUITERUN_TESTS", "@from env"),
        temp.path(),
    );

    assert!(output.ends_with("-t\nfrom env"), "{}", output);
}

#[test]
fn test_invalid_configuration_is_fatal() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("suiterun.toml"), "[fork]\nforks = 2\n").unwrap();

    suiterun(temp.path())
        .arg("args")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_invalid_span_scale_factor_flag_is_fatal() {
    let temp = TempDir::new().unwrap();
    suiterun(temp.path())
        .args(["args", "--span-scale-factor", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("span-scale-factor"));
}

// ══════════════════════════════════════════════════════════════════════════════
// DISCOVER
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_discover_lists_sorted_classes() {
    let temp = TempDir::new().unwrap();
    for class in [
        "target/test-classes/com/acme/ZSuite.class",
        "target/test-classes/com/acme/ASuite.class",
        "target/test-classes/com/acme/ASuite$1.class",
        "target/test-classes/logback-test.xml",
    ] {
        touch(temp.path(), class);
    }

    let output = stdout_of(suiterun(temp.path()).arg("discover"), temp.path());

    insta::assert_snapshot!(output, @r"
com.acme.ASuite
com.acme.ZSuite
");
}

#[test]
fn test_discover_json() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "target/test-classes/FooSuite.class");

    let output = stdout_of(
        suiterun(temp.path()).args(["discover", "--json"]),
        temp.path(),
    );

    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["root"], "[ROOT]/target/test-classes");
    assert_eq!(value["classes"], serde_json::json!(["FooSuite"]));
}

#[test]
fn test_discover_missing_output_is_empty() {
    let temp = TempDir::new().unwrap();
    suiterun(temp.path())
        .arg("discover")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

// ══════════════════════════════════════════════════════════════════════════════
// RUN
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_run_in_process_without_library_is_fatal() {
    let temp = TempDir::new().unwrap();
    suiterun(temp.path())
        .args(["run", "--fork-mode", "never"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing from classpath"));
}

#[cfg(unix)]
mod forked {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    /// Stand-in for `java`: answers the verifier for classes ending in
    /// "Suite" and fails the runner for BSuite.
    const FAKE_JAVA: &str = r#"#!/bin/sh
for last; do :; done
case " $* " in
  *IsClassATestSuite*)
    case "$last" in
      *Suite) exit 0 ;;
      *) exit 1 ;;
    esac ;;
esac
echo "running $last"
if [ "$last" = "BSuite" ]; then
  echo "BSuite failed" 1>&2
  exit 1
fi
exit 0
"#;

    fn fake_java(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-java");
        fs::write(&path, body).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn test_run_fork_once_passes() {
        let temp = TempDir::new().unwrap();
        let java = fake_java(temp.path(), FAKE_JAVA);

        suiterun(temp.path())
            .args(["run", "--suites", "ASuite", "--java"])
            .arg(&java)
            .assert()
            .success()
            .stdout(predicate::str::contains("running ASuite"))
            .stdout(predicate::str::contains("Tests passed (fork-once, 1 process launched)"));
    }

    #[test]
    fn test_run_fork_once_failure_exits_one() {
        let temp = TempDir::new().unwrap();
        let java = fake_java(temp.path(), FAKE_JAVA);

        suiterun(temp.path())
            .args(["run", "--suites", "BSuite", "--java"])
            .arg(&java)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("BSuite failed"))
            .stdout(predicate::str::contains("Tests failed: test process exited with code 1"));
    }

    #[test]
    fn test_run_per_suite_stops_at_first_failure() {
        let temp = TempDir::new().unwrap();
        let java = fake_java(temp.path(), FAKE_JAVA);
        for class in ["ASuite", "BSuite", "CSuite", "Helper"] {
            touch(temp.path(), &format!("target/test-classes/{}.class", class));
        }

        suiterun(temp.path())
            .args(["run", "--fork-mode", "suite-sequential", "--java"])
            .arg(&java)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("running ASuite"))
            .stdout(predicate::str::contains("running BSuite"))
            .stdout(predicate::str::contains("running CSuite").not())
            .stdout(predicate::str::contains("suite BSuite exited with code 1"));
    }

    #[test]
    fn test_run_per_suite_skips_non_suites() {
        let temp = TempDir::new().unwrap();
        let java = fake_java(temp.path(), FAKE_JAVA);
        for class in ["ASuite", "CSuite", "Helper"] {
            touch(temp.path(), &format!("target/test-classes/{}.class", class));
        }

        suiterun(temp.path())
            .args(["run", "--fork-mode", "suite-sequential", "--java"])
            .arg(&java)
            .assert()
            .success()
            .stdout(predicate::str::contains("running Helper").not())
            .stdout(predicate::str::contains("1 non-suite classes skipped"))
            .stderr(predicate::str::contains(
                "Class Helper doesn't appear to be a test suite. Skipping.",
            ));
    }

    #[test]
    fn test_run_invalid_fork_mode_forks_once() {
        let temp = TempDir::new().unwrap();
        let java = fake_java(temp.path(), FAKE_JAVA);

        suiterun(temp.path())
            .args(["run", "--fork-mode", "sometimes", "--java"])
            .arg(&java)
            .assert()
            .success()
            .stdout(predicate::str::contains("fork-once"))
            .stderr(predicate::str::contains("Invalid fork mode"));
    }

    #[test]
    fn test_run_logs_command_when_asked() {
        let temp = TempDir::new().unwrap();
        let java = fake_java(temp.path(), FAKE_JAVA);

        suiterun(temp.path())
            .args(["run", "--log-command", "--java"])
            .arg(&java)
            .assert()
            .success()
            .stderr(predicate::str::contains("Forking test runner via:"))
            .stderr(predicate::str::contains("org.scalatest.tools.Runner -R"));
    }

    #[test]
    fn test_run_timeout_is_fatal() {
        let temp = TempDir::new().unwrap();
        let java = fake_java(temp.path(), "#!/bin/sh\nexec sleep 30\n");

        suiterun(temp.path())
            .args(["run", "--timeout", "1", "--java"])
            .arg(&java)
            .assert()
            .code(2)
            .stderr(predicate::str::contains(
                "Timed out after 1 seconds waiting for forked process to complete.",
            ));
    }

    #[test]
    fn test_run_per_suite_timeout_names_suite() {
        let temp = TempDir::new().unwrap();
        let java = fake_java(
            temp.path(),
            "#!/bin/sh\ncase \" $* \" in\n  *IsClassATestSuite*) exit 0 ;;\nesac\nexec sleep 30\n",
        );
        touch(temp.path(), "target/test-classes/com/acme/SlowSuite.class");

        suiterun(temp.path())
            .args(["run", "--fork-mode", "suite-sequential", "--timeout", "1", "--java"])
            .arg(&java)
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Timed out after 1 seconds"))
            .stderr(predicate::str::contains("Suite: com.acme.SlowSuite"));
    }

    #[test]
    fn test_missing_java_is_fatal() {
        let temp = TempDir::new().unwrap();

        suiterun(temp.path())
            .args(["run", "--java"])
            .arg(temp.path().join("no-such-java"))
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Failed to launch"));
    }
}
