use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::ScriptError;

/// Result code reported for any run that did not yield a parsable code
pub const FAILURE_CODE: i32 = -1;

/// Outcome of one script execution
#[derive(Debug)]
pub struct ScriptRun {
    pub result: Result<i32, ScriptError>,
    /// Stdout followed by stderr, empty when the process never started
    pub output: String,
}

impl ScriptRun {
    pub fn failed(error: ScriptError, output: impl Into<String>) -> Self {
        Self {
            result: Err(error),
            output: output.into(),
        }
    }

    /// The parsed code, or [`FAILURE_CODE`] when the run failed
    pub fn code(&self) -> i32 {
        match &self.result {
            Ok(code) => *code,
            Err(_) => FAILURE_CODE,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }
}

/// Executes an operator script and reports its result code
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run `path` with whitespace separated `args`; a zero `timeout` waits
    /// for the process indefinitely
    async fn run(&self, path: &str, args: &str, timeout: Duration) -> ScriptRun;
}

/// Spawns scripts as child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessScriptRunner;

impl ProcessScriptRunner {
    pub fn new() -> Self {
        Self
    }

    fn resolve(path: &str) -> Result<PathBuf, ScriptError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(ScriptError::EmptyPath);
        }
        std::path::absolute(path).map_err(|e| ScriptError::InvalidPath {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ScriptRunner for ProcessScriptRunner {
    async fn run(&self, path: &str, args: &str, timeout: Duration) -> ScriptRun {
        let resolved = match Self::resolve(path) {
            Ok(resolved) => resolved,
            Err(e) => return ScriptRun::failed(e, ""),
        };

        debug!("Running script {} {}", resolved.display(), args);
        let mut command = Command::new(&resolved);
        command
            .args(args.split_whitespace())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Dropping the output future on timeout kills the child
        let output = if timeout.is_zero() {
            command.output().await
        } else {
            match tokio::time::timeout(timeout, command.output()).await {
                Ok(output) => output,
                Err(_) => {
                    warn!(
                        "Script {} did not finish within {:?}",
                        resolved.display(),
                        timeout
                    );
                    return ScriptRun::failed(ScriptError::Timeout(timeout), "");
                }
            }
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                return ScriptRun::failed(
                    ScriptError::Spawn {
                        path: resolved.display().to_string(),
                        reason: e.to_string(),
                    },
                    "",
                )
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return ScriptRun::failed(ScriptError::ExitStatus(output.status.to_string()), combined);
        }

        ScriptRun {
            result: parse_result_code(&combined),
            output: combined,
        }
    }
}

/// Read the result code from the last whitespace separated token
pub fn parse_result_code(output: &str) -> Result<i32, ScriptError> {
    let token = output.split_whitespace().last().unwrap_or_default();
    token
        .parse::<i32>()
        .map_err(|_| ScriptError::InvalidOutput(token.to_string()))
}
