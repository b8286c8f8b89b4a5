//! ABOUTME: Bounded runner for short-lived external helper commands
//! ABOUTME: Enforces a deadline, caps captured output, and records command metrics

use metrics::{counter, histogram};
use mw_core::{Error, MonotonicTimer, Result};
use std::{
    ffi::OsString,
    path::Path,
    process::{ExitStatus, Stdio},
    time::Duration,
};
use tokio::{process::Command, time::timeout};
use tracing::{debug, instrument, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_OUTPUT_LIMIT: usize = 16 * 1024;

/// A command line plus the limits it runs under
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub env: Vec<(OsString, OsString)>,
    /// The child is killed once this elapses
    pub timeout: Duration,
    /// Bytes kept from each of stdout and stderr
    pub output_limit: usize,
}

impl Invocation {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            output_limit: DEFAULT_OUTPUT_LIMIT,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env_var(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn output_limit(mut self, limit: usize) -> Self {
        self.output_limit = limit;
        self
    }

    /// Program file name; keeps metric label cardinality low
    fn label(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// How a command ended
#[derive(Debug)]
pub struct Completion {
    /// `None` when the deadline passed and the child was killed
    pub status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    /// Either stream was cut at the output limit
    pub truncated: bool,
}

impl Completion {
    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }

    pub fn success(&self) -> bool {
        self.status.map(|s| s.success()).unwrap_or(false)
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }
}

/// Run `invocation` to completion or until its deadline.
///
/// Spawn and wait failures are errors; a non-zero exit or a timeout is
/// reported through the returned [`Completion`].
#[instrument(skip(invocation), fields(program = %invocation.label()))]
pub async fn run(invocation: &Invocation) -> Result<Completion> {
    let timer = MonotonicTimer::new();
    let label = invocation.label();

    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .envs(invocation.env.iter().map(|(k, v)| (k, v)))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // Dropping the wait future on timeout kills the child
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| {
        counter!("command_spawn_failures_total", "program" => label.clone()).increment(1);
        Error::External(format!(
            "Failed to spawn {}: {}",
            invocation.program.to_string_lossy(),
            e
        ))
    })?;
    debug!(pid = child.id(), "Command started");

    let completion = match timeout(invocation.timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let (stdout, stdout_cut) = capped_text(&output.stdout, invocation.output_limit);
            let (stderr, stderr_cut) = capped_text(&output.stderr, invocation.output_limit);
            Completion {
                status: Some(output.status),
                stdout,
                stderr,
                duration: timer.elapsed(),
                truncated: stdout_cut || stderr_cut,
            }
        }
        Ok(Err(e)) => {
            return Err(Error::External(format!("Failed to wait for command: {}", e)));
        }
        Err(_) => {
            warn!(
                timeout_ms = invocation.timeout.as_millis() as u64,
                "Command exceeded its deadline and was killed"
            );
            counter!("command_timeout_total", "program" => label.clone()).increment(1);
            Completion {
                status: None,
                stdout: String::new(),
                stderr: String::new(),
                duration: timer.elapsed(),
                truncated: false,
            }
        }
    };

    histogram!("command_duration_seconds", "program" => label.clone())
        .record(completion.duration.as_secs_f64());
    if completion.success() {
        counter!("command_success_total", "program" => label).increment(1);
    } else if !completion.timed_out() {
        counter!("command_failure_total", "program" => label).increment(1);
    }

    debug!(
        exit_code = completion.exit_code(),
        duration_ms = completion.duration.as_millis() as u64,
        "Command finished"
    );
    Ok(completion)
}

/// Lossy UTF-8 of at most `limit` bytes, cut on a character boundary
fn capped_text(bytes: &[u8], limit: usize) -> (String, bool) {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= limit {
        return (text.into_owned(), false);
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    (text[..end].to_string(), true)
}
