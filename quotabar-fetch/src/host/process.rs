//! Subprocess execution for command-backed providers.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::error::ProcessError;

/// Default command timeout. Kept below the orchestrator's refresh ceiling.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

// ============================================================================
// Process Output
// ============================================================================

/// Output from a process execution.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Standard output content.
    pub stdout: String,
    /// Standard error content.
    pub stderr: String,
    /// Exit code (0 = success, -1 = killed by signal).
    pub exit_code: i32,
    /// How long the command took to execute.
    pub duration: Duration,
}

impl ProcessOutput {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the stdout if successful, otherwise an error.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::NonZeroExit`] with the trimmed stderr.
    pub fn stdout_if_success(&self) -> Result<&str, ProcessError> {
        if self.success() {
            Ok(&self.stdout)
        } else {
            Err(ProcessError::NonZeroExit {
                code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

// ============================================================================
// Process Runner
// ============================================================================

/// Runs external commands with a hard timeout.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new process runner.
    pub fn new() -> Self {
        Self
    }

    /// Run a command with the default timeout.
    ///
    /// # Errors
    ///
    /// See [`ProcessRunner::run_with_options`].
    pub async fn run(&self, cmd: &str, args: &[String]) -> Result<ProcessOutput, ProcessError> {
        self.run_with_options(cmd, args, &[], DEFAULT_TIMEOUT).await
    }

    /// Run a command with environment variables and a timeout.
    ///
    /// The child is killed if the timeout elapses or the future is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::NotFound`] if the command is not on `PATH`,
    /// [`ProcessError::Timeout`] if it does not finish in time, or
    /// [`ProcessError::Io`] if it cannot be spawned.
    #[instrument(skip(self, args, env), fields(cmd = %cmd, timeout = ?timeout))]
    pub async fn run_with_options(
        &self,
        cmd: &str,
        args: &[String],
        env: &[(String, String)],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        let cmd_path = self.which(cmd).ok_or_else(|| {
            warn!(cmd = %cmd, "Command not found");
            ProcessError::NotFound(cmd.to_string())
        })?;

        debug!(args = ?args, "Running command");
        let start = Instant::now();

        let mut command = Command::new(&cmd_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in env {
            command.env(key, value);
        }

        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(cmd = %cmd, "Command timed out");
                return Err(ProcessError::Timeout(timeout));
            }
        };

        let result = ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        };

        debug!(
            exit_code = result.exit_code,
            duration = ?result.duration,
            stdout_len = result.stdout.len(),
            "Command completed"
        );

        Ok(result)
    }

    /// Check if a command exists on `PATH` (or is an executable path).
    pub fn command_exists(&self, cmd: &str) -> bool {
        self.which(cmd).is_some()
    }

    /// Resolve a command to its executable path.
    pub fn which(&self, cmd: &str) -> Option<PathBuf> {
        which::which(cmd).ok()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_command_exists() {
        let runner = ProcessRunner::new();
        assert!(runner.command_exists("sh"));
        assert!(!runner.command_exists("definitely_not_a_real_command_12345"));
    }

    #[tokio::test]
    async fn test_run_echo() {
        let runner = ProcessRunner::new();
        let output = runner.run("echo", &args(&["hello", "world"])).await.unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello world");
    }

    #[tokio::test]
    async fn test_run_failure_exposes_stderr() {
        let runner = ProcessRunner::new();
        let output = runner
            .run("sh", &args(&["-c", "echo nope >&2; exit 3"]))
            .await
            .unwrap();

        assert!(!output.success());
        match output.stdout_if_success() {
            Err(ProcessError::NonZeroExit { code, stderr }) => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "nope");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_env() {
        let runner = ProcessRunner::new();
        let env = vec![("QUOTABAR_TEST".to_string(), "42".to_string())];
        let output = runner
            .run_with_options("sh", &args(&["-c", "echo $QUOTABAR_TEST"]), &env, DEFAULT_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "42");
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let runner = ProcessRunner::new();
        let result = runner
            .run_with_options("sleep", &args(&["5"]), &[], Duration::from_millis(100))
            .await;
        assert!(matches!(result, Err(ProcessError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_run_not_found() {
        let runner = ProcessRunner::new();
        let result = runner.run("not_a_real_command_xyz", &[]).await;
        assert!(matches!(result, Err(ProcessError::NotFound(_))));
    }
}
