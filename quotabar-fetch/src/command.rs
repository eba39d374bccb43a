//! Command-backed provider adapter.
//!
//! Runs a user-configured command that prints one JSON [`UsageSnapshot`] on
//! stdout. This is the generic bridge to provider-specific tooling that lives
//! outside QuotaBar.

use async_trait::async_trait;
use quotabar_core::{ProviderKind, UsageSnapshot};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::host::process::{ProcessRunner, DEFAULT_TIMEOUT};
use crate::registry::ProviderFetcher;

/// Longest timeout a command may use. Stays under the 30s refresh ceiling.
pub const MAX_COMMAND_TIMEOUT: Duration = Duration::from_secs(25);

/// Adapter that shells out to a command for usage data.
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    kind: ProviderKind,
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    timeout: Duration,
    runner: ProcessRunner,
}

impl CommandFetcher {
    /// Creates an adapter for `kind` running `program`.
    pub fn new(kind: ProviderKind, program: impl Into<String>) -> Self {
        Self {
            kind,
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            runner: ProcessRunner::new(),
        }
    }

    /// Sets the command arguments.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Sets the timeout, capped at [`MAX_COMMAND_TIMEOUT`].
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if timeout > MAX_COMMAND_TIMEOUT {
            warn!(
                provider = ?self.kind,
                requested = ?timeout,
                "Command timeout exceeds refresh ceiling, capping"
            );
        }
        self.timeout = timeout.min(MAX_COMMAND_TIMEOUT);
        self
    }

    /// Returns the effective timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the configured program.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns true if the program can be resolved.
    pub fn is_available(&self) -> bool {
        self.runner.command_exists(&self.program)
    }
}

/// Parses command stdout into a snapshot.
///
/// # Errors
///
/// Returns [`FetchError::InvalidResponse`] for empty output and
/// [`FetchError::Json`] for malformed documents.
pub fn parse_snapshot(stdout: &str) -> Result<UsageSnapshot, FetchError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidResponse("empty output".to_string()));
    }
    Ok(serde_json::from_str(trimmed)?)
}

#[async_trait]
impl ProviderFetcher for CommandFetcher {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn fetch_usage(&self) -> Result<UsageSnapshot, FetchError> {
        let output = self
            .runner
            .run_with_options(&self.program, &self.args, &self.env, self.timeout)
            .await?;
        let stdout = output.stdout_if_success()?;
        let snapshot = parse_snapshot(stdout)?;

        debug!(
            provider = ?self.kind,
            has_data = snapshot.has_data(),
            error = ?snapshot.error,
            "Parsed command snapshot"
        );
        Ok(snapshot)
    }
}
