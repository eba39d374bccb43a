//! Where notifications go.

use async_trait::async_trait;
use quotabar_fetch::ProcessRunner;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound on a desktop notifier invocation.
const NOTIFIER_TIMEOUT: Duration = Duration::from_secs(5);

/// Receives `(title, body)` pairs, one per detected crossing.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one notification. Delivery failures are logged, not returned.
    async fn notify(&self, title: &str, body: &str);
}

// ============================================================================
// Log Sink
// ============================================================================

/// Writes notifications to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, title: &str, body: &str) {
        info!(title, body, "Notification");
    }
}

// ============================================================================
// Desktop Sink
// ============================================================================

/// Shows a desktop notification.
///
/// Uses `osascript` on macOS and `notify-send` elsewhere. Falls back to the
/// log when neither is available.
#[derive(Debug, Default, Clone)]
pub struct DesktopSink {
    runner: ProcessRunner,
}

impl DesktopSink {
    /// Creates a desktop sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the notifier command and arguments for this platform.
    fn command(title: &str, body: &str) -> (&'static str, Vec<String>) {
        if cfg!(target_os = "macos") {
            let script = format!(
                "display notification \"{}\" with title \"{}\"",
                escape_applescript(body),
                escape_applescript(title)
            );
            ("osascript", vec!["-e".to_string(), script])
        } else {
            (
                "notify-send",
                vec![
                    "--app-name=QuotaBar".to_string(),
                    title.to_string(),
                    body.to_string(),
                ],
            )
        }
    }
}

#[async_trait]
impl NotificationSink for DesktopSink {
    async fn notify(&self, title: &str, body: &str) {
        let (program, args) = Self::command(title, body);
        if !self.runner.command_exists(program) {
            debug!(program, "Notifier not installed, logging instead");
            LogSink.notify(title, body).await;
            return;
        }

        match self
            .runner
            .run_with_options(program, &args, &[], NOTIFIER_TIMEOUT)
            .await
        {
            Ok(output) if output.success() => debug!(title, "Desktop notification sent"),
            Ok(output) => warn!(
                program,
                code = output.exit_code,
                stderr = %output.stderr.trim(),
                "Notifier exited with an error"
            ),
            Err(e) => warn!(program, error = %e, "Failed to run notifier"),
        }
    }
}

/// Escapes a string for an AppleScript string literal.
fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\n', '\r'], " ")
}

// ============================================================================
// Recording Sink
// ============================================================================

/// Keeps every notification in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, oldest first.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Number of notifications delivered.
    pub fn len(&self) -> usize {
        self.sent.lock().map(|v| v.len()).unwrap_or_default()
    }

    /// Returns true if nothing was delivered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, title: &str, body: &str) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((title.to_string(), body.to_string()));
        }
    }
}
