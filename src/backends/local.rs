//! Local command-line scanner adapter.
//!
//! This module provides an engine that submits targets to a scanner
//! installed on the host by invoking its command-line client, in the
//! style of `clamdscan`.
//!
//! # Requirements
//!
//! - The scanner command must be on `PATH` or given as an absolute path.
//! - The command must follow the conventional exit-code contract:
//!   `0` clean, `1` infected, anything else failure.
//!
//! # Output parsing
//!
//! Infections are reported on stdout as `<path>: <threat> FOUND`. The
//! adapter extracts the threat name from the first such line; when the
//! exit code says infected but no line matches, the verdict carries
//! `"unknown threat"` rather than discarding the detection.

use crate::core::error::{EngineError, EngineResult};
use crate::core::traits::ScanEngine;
use crate::core::types::EngineVerdict;

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Scan engine backed by a local command-line scanner.
///
/// The configured command is invoked once per item with the quarantine
/// path appended after any configured arguments. Directories are passed
/// as-is; recursive flags such as ClamAV's `-r` belong in the argument
/// list.
///
/// # Example
///
/// ```rust
/// use fileward::backends::LocalProcessEngine;
/// use std::time::Duration;
///
/// let engine = LocalProcessEngine::new("clamav", "clamdscan")
///     .with_args(["-r", "--fdpass"])
///     .with_timeout(Duration::from_secs(120));
/// ```
#[derive(Debug, Clone)]
pub struct LocalProcessEngine {
    name: String,
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl LocalProcessEngine {
    /// Creates a new engine invoking the given command.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replaces the argument list passed before the target path.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Appends one argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets the per-scan deadline. The child process is killed when it
    /// expires.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the command this engine invokes.
    pub fn command(&self) -> &str {
        &self.command
    }

    async fn try_scan(&self, target: &Path) -> EngineResult<EngineVerdict> {
        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|e| EngineError::process(&self.command, e))?;

        // Dropping the output future on timeout kills the child via
        // kill_on_drop, so a hung scanner does not outlive its deadline.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| EngineError::timeout(self.timeout))?
            .map_err(|e| EngineError::process(&self.command, e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(classify(output.status.code(), &stdout, &stderr))
    }
}

#[async_trait]
impl ScanEngine for LocalProcessEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn scan_timeout(&self) -> Duration {
        self.timeout
    }

    async fn scan(&self, target: &Path) -> EngineVerdict {
        match self.try_scan(target).await {
            Ok(verdict) => verdict,
            Err(err) => {
                tracing::debug!(
                    engine = %self.name,
                    target = %target.display(),
                    error = %err,
                    "local scan failed"
                );
                EngineVerdict::error(err.to_string())
            }
        }
    }
}

/// Maps an exit status and captured output to a verdict.
fn classify(code: Option<i32>, stdout: &str, stderr: &str) -> EngineVerdict {
    match code {
        Some(0) => EngineVerdict::clean(first_line(stdout).unwrap_or("ok")),
        Some(1) => {
            EngineVerdict::infected(parse_threat(stdout).unwrap_or_else(|| "unknown threat".into()))
        }
        Some(code) => {
            let detail = first_line(stderr)
                .or_else(|| first_line(stdout))
                .unwrap_or("no output");
            EngineVerdict::error(format!("scanner exited with code {code}: {detail}"))
        }
        None => EngineVerdict::error("scanner terminated by signal"),
    }
}

/// Extracts the threat name from the first `<path>: <threat> FOUND` line.
pub(crate) fn parse_threat(stdout: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        let rest = line.trim_end().strip_suffix("FOUND")?;
        let (_, threat) = rest.split_once(':')?;
        let threat = threat.trim();
        (!threat.is_empty()).then(|| threat.to_string())
    })
}

fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|l| !l.is_empty())
}
