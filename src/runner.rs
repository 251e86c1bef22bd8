//! Test command execution
//!
//! Runs a shell command with a sanitized environment, captures both output
//! streams, enforces a wall-clock timeout, and hands the captured output to
//! the framework parser. Artifacts land in the report directory via
//! [`crate::report`].

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::error::{VerdictError, VerdictResult};
use crate::models::{Framework, ParsedRun};
use crate::report::{write_report, RunReport};
use crate::security::{sanitize_env, validate_command, SecurityPolicy};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// One test run to execute.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub command: String,
    pub working_dir: PathBuf,
    pub framework: Framework,
    pub output_dir: PathBuf,
    pub timeout: Duration,
    pub env: HashMap<String, String>,
    pub policy: SecurityPolicy,
}

impl RunRequest {
    pub fn new(command: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            working_dir: working_dir.into(),
            framework: Framework::Generic,
            output_dir: PathBuf::from("test_reports"),
            timeout: Duration::from_secs(300),
            env: HashMap::new(),
            policy: SecurityPolicy::default(),
        }
    }
}

/// What came back from a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub parsed: ParsedRun,
    pub exit_code: Option<i32>,
    pub duration: Duration,
    pub report_dir: PathBuf,
    pub started_at: DateTime<Utc>,
}

/// Validates, executes, parses, and records a test run.
pub fn run_tests(request: &RunRequest) -> VerdictResult<RunOutcome> {
    if request.command.trim().is_empty() {
        return Err(VerdictError::EmptyCommand);
    }

    if !request.working_dir.is_dir() {
        return Err(VerdictError::WorkingDirNotFound {
            path: request.working_dir.clone(),
        });
    }

    validate_command(&request.command, &request.policy)?;

    let report_dir = if request.output_dir.is_absolute() {
        request.output_dir.clone()
    } else {
        request.working_dir.join(&request.output_dir)
    };
    std::fs::create_dir_all(&report_dir)?;

    let started_at = Utc::now();
    let start = Instant::now();

    let mut child = spawn_shell(request)?;

    // Readers run on their own threads so a full pipe can never deadlock
    // the wait loop.
    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    let status = wait_with_timeout(&mut child, start, request.timeout)?;
    let duration = start.elapsed();

    let stdout = collect(stdout_reader)?;
    let stderr = collect(stderr_reader)?;

    let parsed = crate::parsers::parse_output(request.framework, &stdout, &stderr);

    let report = RunReport {
        command: request.command.clone(),
        framework: request.framework,
        started_at,
        duration_ms: duration.as_millis() as u64,
        exit_code: status,
        results: parsed.clone(),
    };
    write_report(&report_dir, &stdout, &stderr, &report)?;

    Ok(RunOutcome {
        parsed,
        exit_code: status,
        duration,
        report_dir,
        started_at,
    })
}

fn spawn_shell(request: &RunRequest) -> VerdictResult<Child> {
    #[cfg(unix)]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&request.command);
        cmd
    };

    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(&request.command);
        cmd
    };

    cmd.current_dir(&request.working_dir)
        .envs(sanitize_env(&request.env))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    Ok(cmd.spawn()?)
}

fn wait_with_timeout(
    child: &mut Child,
    start: Instant,
    timeout: Duration,
) -> VerdictResult<Option<i32>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status.code());
        }

        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(VerdictError::Timeout {
                timeout_secs: timeout.as_secs(),
            });
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Option<JoinHandle<std::io::Result<String>>> {
    stream.map(|mut stream| {
        thread::spawn(move || {
            let mut buf = String::new();
            stream.read_to_string(&mut buf)?;
            Ok(buf)
        })
    })
}

fn collect(reader: Option<JoinHandle<std::io::Result<String>>>) -> VerdictResult<String> {
    match reader {
        Some(handle) => {
            let content = handle
                .join()
                .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "output reader thread panicked"))??;
            Ok(content)
        }
        None => Ok(String::new()),
    }
}
