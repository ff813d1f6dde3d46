//! Forked process launching
//!
//! A [`LaunchRequest`] describes one process: `<program> -D<k>=<v>...
//! -Dbasedir=<dir> <arg line> <debug line> <entry point> <args>`, run in the
//! working directory with `CLASSPATH` set from the test classpath. The
//! [`SystemLauncher`] forwards both output streams line by line while the
//! process runs and kills it when the timeout elapses.

use crate::error::{RunError, RunResult};
use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use suiterun_config::Configuration;

/// Environment variable carrying the test classpath
pub const CLASSPATH_VAR: &str = "CLASSPATH";

const POLL_INTERVAL: Duration = Duration::from_millis(25);
/// How long output is still collected after the process exits. Streams
/// inherited by a background child stay open past this.
const OUTPUT_GRACE: Duration = Duration::from_secs(1);

/// Default remote debug arguments for the given port
pub fn default_debug_line(port: u16) -> String {
    format!(
        "-Xdebug -Xrunjdwp:transport=dt_socket,server=y,suspend=y,address={}",
        port
    )
}

/// Debug argument line for forked processes, if debugging is enabled
pub fn debug_arguments(config: &Configuration) -> Option<String> {
    if !config.debug_forked_process {
        return None;
    }
    Some(
        config
            .debug_arg_line
            .clone()
            .unwrap_or_else(|| default_debug_line(config.debugger_port)),
    )
}

/// Split an argument line into words
///
/// Words are separated by whitespace; single and double quotes group words
/// and are removed.
pub fn split_arg_line(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if in_word {
        words.push(current);
    }
    words
}

/// Description of one process to launch
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRequest {
    /// Working directory, also passed as `-Dbasedir`
    pub working_dir: PathBuf,
    /// Executable
    pub program: PathBuf,
    /// Extra environment variables
    pub environment: BTreeMap<String, String>,
    /// Elements joined into `CLASSPATH`
    pub classpath: Vec<PathBuf>,
    /// `-D` defines placed before `-Dbasedir`
    pub system_properties: BTreeMap<String, String>,
    /// User arguments for the process
    pub arg_line: Option<String>,
    /// Debug arguments, present only when debugging
    pub debug_line: Option<String>,
    /// Class to run
    pub entry_point: String,
    /// Arguments after the entry point
    pub args: Vec<String>,
    /// Seconds before the process is killed (0 = never)
    pub timeout_secs: u64,
}

impl LaunchRequest {
    /// Create a request with no environment, properties or timeout
    pub fn new(
        program: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
        entry_point: impl Into<String>,
    ) -> Self {
        Self {
            working_dir: working_dir.into(),
            program: program.into(),
            environment: BTreeMap::new(),
            classpath: Vec::new(),
            system_properties: BTreeMap::new(),
            arg_line: None,
            debug_line: None,
            entry_point: entry_point.into(),
            args: Vec::new(),
            timeout_secs: 0,
        }
    }

    /// Test runner invocation for a forked run
    pub fn forked(config: &Configuration, args: &[String]) -> Self {
        let mut request = Self::new(&config.java, &config.base_dir, &config.runner)
            .with_classpath(config.test_classpath())
            .with_args(args.to_vec())
            .with_timeout(config.timeout_secs);
        request.environment = config.environment_variables.clone();
        request.system_properties = config.system_properties.clone();
        request.arg_line = config.arg_line.clone();
        request.debug_line = debug_arguments(config);
        request
    }

    /// Suite verifier invocation for one class
    pub fn verifier(config: &Configuration, class: &str) -> Self {
        Self::new(&config.java, &config.base_dir, &config.verifier)
            .with_classpath(config.test_classpath())
            .with_args(vec![
                config.test_output_dir.display().to_string(),
                class.to_string(),
            ])
    }

    pub fn with_classpath(mut self, classpath: Vec<PathBuf>) -> Self {
        self.classpath = classpath;
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Append `-s <suite>` to the runner arguments
    pub fn for_suite(mut self, suite: &str) -> Self {
        self.args.push("-s".to_string());
        self.args.push(suite.to_string());
        self
    }

    /// Arguments passed to the program, in order
    pub fn arguments(&self) -> Vec<String> {
        let mut arguments: Vec<String> = self
            .system_properties
            .iter()
            .map(|(key, value)| format!("-D{}={}", key, value))
            .collect();
        arguments.push(format!("-Dbasedir={}", self.working_dir.display()));
        if let Some(line) = &self.arg_line {
            arguments.extend(split_arg_line(line));
        }
        if let Some(line) = &self.debug_line {
            arguments.extend(split_arg_line(line));
        }
        arguments.push(self.entry_point.clone());
        arguments.extend(self.args.iter().cloned());
        arguments
    }

    /// Program followed by its arguments, for logging
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.arguments());
        parts.join(" ")
    }

    /// `CLASSPATH` value joined with the platform separator
    pub fn classpath_value(&self) -> RunResult<OsString> {
        env::join_paths(&self.classpath).map_err(|e| RunError::InvalidClasspath(e.to_string()))
    }

    fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}

/// Outcome of one launched process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessResult {
    /// Exit code (1 when killed by a signal)
    pub exit_code: i32,
    /// The process was killed after the timeout elapsed
    pub timed_out: bool,
}

impl ProcessResult {
    pub fn exited(exit_code: i32) -> Self {
        Self {
            exit_code,
            timed_out: false,
        }
    }

    pub fn timed_out() -> Self {
        Self {
            exit_code: 1,
            timed_out: true,
        }
    }

    /// Exited with code 0 before the timeout
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

/// Receives process output one line at a time
pub trait OutputSink {
    fn line(&mut self, line: &str);
}

impl<F: FnMut(&str)> OutputSink for F {
    fn line(&mut self, line: &str) {
        self(line)
    }
}

/// Prints every line to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn line(&mut self, line: &str) {
        println!("{}", line);
    }
}

/// Runs a [`LaunchRequest`] to completion
pub trait ProcessLauncher {
    fn launch(&self, request: &LaunchRequest, sink: &mut dyn OutputSink)
        -> RunResult<ProcessResult>;
}

/// Launches real OS processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }

    fn spawn(&self, request: &LaunchRequest) -> RunResult<Child> {
        let program = request.program.display().to_string();
        Command::new(&request.program)
            .args(request.arguments())
            .current_dir(&request.working_dir)
            .envs(&request.environment)
            .env(CLASSPATH_VAR, request.classpath_value()?)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RunError::launch(program, e))
    }
}

impl ProcessLauncher for SystemLauncher {
    fn launch(
        &self,
        request: &LaunchRequest,
        sink: &mut dyn OutputSink,
    ) -> RunResult<ProcessResult> {
        let program = request.program.display().to_string();
        let mut child = self.spawn(request)?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        let deadline = request.timeout().map(|t| Instant::now() + t);

        let status = loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(line) => sink.line(&line),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => thread::sleep(POLL_INTERVAL),
            }

            if let Some(status) = child
                .try_wait()
                .map_err(|e| RunError::launch(program.as_str(), e))?
            {
                break status;
            }

            if deadline.map_or(false, |d| Instant::now() >= d) {
                tracing::debug!(pid = child.id(), "killing forked process after timeout");
                let _ = child.kill();
                child
                    .wait()
                    .map_err(|e| RunError::launch(program.as_str(), e))?;
                drain(&rx, sink);
                return Ok(ProcessResult::timed_out());
            }
        };

        if drain_until(&rx, sink, Instant::now() + OUTPUT_GRACE) {
            for reader in readers {
                let _ = reader.join();
            }
        } else {
            tracing::debug!("output streams still open after exit; detaching readers");
        }

        Ok(ProcessResult::exited(status.code().unwrap_or(1)))
    }
}

/// Send each line of `stream` to `tx` until EOF
fn forward_lines<R: Read + Send + 'static>(stream: R, tx: Sender<String>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
                        buf.pop();
                    }
                    if tx.send(String::from_utf8_lossy(&buf).into_owned()).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Forward lines until both streams close (true) or `until` passes (false)
fn drain_until(rx: &Receiver<String>, sink: &mut dyn OutputSink, until: Instant) -> bool {
    loop {
        let now = Instant::now();
        if now >= until {
            return false;
        }
        match rx.recv_timeout(until - now) {
            Ok(line) => sink.line(&line),
            Err(RecvTimeoutError::Timeout) => return false,
            Err(RecvTimeoutError::Disconnected) => return true,
        }
    }
}

fn drain(rx: &Receiver<String>, sink: &mut dyn OutputSink) {
    for line in rx.try_iter() {
        sink.line(&line);
    }
}
