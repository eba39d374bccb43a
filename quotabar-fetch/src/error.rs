//! Fetch error types.

use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for provider fetch operations.
///
/// The orchestrator only ever sees the `Display` form of this error; it
/// becomes the provider's `last_error` string.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The adapter gave up waiting.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The provider answered with something we cannot use.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] quotabar_core::CoreError),

    /// Process error.
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// No adapter is configured for the provider.
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

// ============================================================================
// Process Error
// ============================================================================

/// Error type for process operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Command not found.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// Command timed out.
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// Non-zero exit code.
    #[error("Command exited with code {code}: {stderr}")]
    NonZeroExit {
        /// Exit code from the process.
        code: i32,
        /// Standard error output.
        stderr: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessError {
    /// Returns true if a later attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::NonZeroExit { .. })
    }
}
