//! Text output formatting with progress bars and colors.

use chrono::{DateTime, Duration, Local, Utc};
use quotabar_core::{Credits, ProviderKind, UsageWindow};
use quotabar_engine::{Freshness, Notification, ProviderState, project};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

// Progress bar characters
const BAR_FULL: char = '█';
const BAR_EMPTY: char = '░';

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
    bar_width: usize,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            bar_width: 10,
        }
    }

    /// Formats one provider: windows, credits, error, freshness and pace.
    pub fn format_state(
        &self,
        state: &ProviderState,
        refresh_interval_seconds: i64,
        now: DateTime<Utc>,
    ) -> String {
        let mut lines = Vec::new();

        let freshness = Freshness::classify(state.updated_at(), refresh_interval_seconds, now);
        lines.push(format!(
            "{} {}",
            self.bold(state.id.display_name()),
            self.format_freshness(freshness, state, now)
        ));

        if let Some(usage) = &state.usage {
            let windows = [
                (&usage.primary, "Session"),
                (&usage.secondary, "Weekly"),
                (&usage.tertiary, "Tier"),
            ];
            for (window, default_label) in windows {
                if let Some(window) = window {
                    let label = window.label.as_deref().unwrap_or(default_label);
                    lines.push(self.format_window(window, label, now));
                }
            }

            if let Some(credits) = &usage.credits {
                lines.push(self.format_credits(credits));
            }

            if let Some(identity) = &usage.identity {
                if let Some(email) = &identity.account_email {
                    lines.push(format!("Account: {}", self.cyan(email)));
                }
                if let Some(plan) = &identity.plan_name {
                    lines.push(format!("Plan:    {plan}"));
                }
            }
        } else if state.last_error.is_none() {
            lines.push(self.dim("No data yet"));
        }

        if let Some(status) = &state.status {
            lines.push(format!(
                "Status:  {} {}",
                self.yellow(status.severity.label()),
                status.summary
            ));
        }

        if let Some(error) = &state.last_error {
            lines.push(self.format_error(error));
        }

        lines.join("\n")
    }

    fn format_freshness(&self, freshness: Freshness, state: &ProviderState, now: DateTime<Utc>) -> String {
        match (freshness, state.updated_at()) {
            (Freshness::Unknown, _) | (_, None) => self.dim("(no data)"),
            (Freshness::Fresh, Some(at)) => self.dim(&format!("(updated {})", format_ago(now - at))),
            (Freshness::Stale, Some(at)) => {
                self.yellow(&format!("(stale, updated {})", format_ago(now - at)))
            }
        }
    }

    /// Formats a usage window with progress bar, reset time and pace.
    fn format_window(&self, window: &UsageWindow, label: &str, now: DateTime<Utc>) -> String {
        let remaining = window.remaining_percent();
        let bar = self.progress_bar(remaining);
        let pct_str = self.color_for_percent(remaining, &format!("{remaining:.0}% left"));

        let mut result = format!("{:<8} {} {}", format!("{label}:"), bar, pct_str);

        if let Some(resets_at) = window.resets_at {
            let reset_str = format_reset_time(resets_at, now);
            result.push_str(&format!("\n         Resets {}", self.dim(&reset_str)));
        } else if let Some(desc) = &window.reset_description {
            result.push_str(&format!("\n         Resets {}", self.dim(desc)));
        }

        if let Some(pace) = project(window, now) {
            result.push_str(&format!("\n         Pace: {}", pace.summary()));
        }

        result
    }

    fn format_credits(&self, credits: &Credits) -> String {
        match (credits.remaining_percent(), credits.valid_total()) {
            (Some(percent), Some(total)) => format!(
                "{:<8} {} {}",
                "Credits:",
                self.progress_bar(percent),
                self.color_for_percent(
                    percent,
                    &format!("{:.0} / {:.0} {}", credits.remaining, total, credits.unit)
                )
            ),
            _ => format!("Credits: {:.0} {}", credits.remaining, credits.unit),
        }
    }

    /// Formats a progress bar.
    pub fn progress_bar(&self, percent_remaining: f64) -> String {
        let clamped = percent_remaining.clamp(0.0, 100.0);
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let filled = ((clamped / 100.0) * self.bar_width as f64).round() as usize;
        let empty = self.bar_width.saturating_sub(filled);

        let bar = format!(
            "{}{}",
            BAR_FULL.to_string().repeat(filled),
            BAR_EMPTY.to_string().repeat(empty)
        );

        self.color_for_percent(percent_remaining, &bar)
    }

    /// One line per provider, for watch mode.
    pub fn format_summary(
        &self,
        states: &[ProviderState],
        refresh_interval_seconds: i64,
        now: DateTime<Utc>,
    ) -> String {
        let mut lines = Vec::new();

        for state in states.iter().filter(|s| s.enabled) {
            let name = state.id.display_name();
            let freshness = Freshness::classify(state.updated_at(), refresh_interval_seconds, now);
            let marker = match freshness {
                Freshness::Stale => self.yellow(" (stale)"),
                _ => String::new(),
            };

            let primary = state.usage.as_ref().and_then(|u| u.primary.as_ref());
            let line = match (primary, &state.last_error) {
                (Some(window), _) => {
                    let remaining = window.remaining_percent();
                    let pct = self.color_for_percent(remaining, &format!("{remaining:.0}%"));
                    let err = if state.last_error.is_some() {
                        format!(" {}", self.red("!"))
                    } else {
                        String::new()
                    };
                    format!("{name:<12} {} {pct}{marker}{err}", self.progress_bar(remaining))
                }
                (None, Some(error)) => format!("{name:<12} {} {}", self.red("Error"), self.dim(error)),
                (None, None) => format!("{name:<12} {}", self.dim("No data")),
            };
            lines.push(line);
        }

        if lines.is_empty() {
            lines.push(self.dim("No providers enabled"));
        }
        lines.join("\n")
    }

    /// Formats provider list header.
    pub fn format_providers_header(&self) -> String {
        format!(
            "{:<14} {:<12} {:<8} {}",
            self.bold("Provider"),
            self.bold("CLI"),
            self.bold("Enabled"),
            self.bold("Command")
        )
    }

    /// Formats a single provider line.
    pub fn format_provider_line(
        &self,
        kind: ProviderKind,
        enabled: bool,
        command: Option<&str>,
        available: bool,
    ) -> String {
        let enabled_str = if enabled { self.green("✓") } else { self.dim("−") };
        let command_str = match command {
            Some(cmd) if available => cmd.to_string(),
            Some(cmd) => format!("{cmd} {}", self.red("(not found)")),
            None => self.dim("not configured"),
        };

        format!(
            "{:<14} {:<12} {:<8} {}",
            kind.display_name(),
            kind.cli_name(),
            enabled_str,
            command_str
        )
    }

    /// Formats a raised notification.
    pub fn format_notification(&self, notification: &Notification) -> String {
        format!(
            "{} {}: {}",
            self.yellow("▲"),
            self.bold(&notification.title),
            notification.body
        )
    }

    /// Formats an error message.
    pub fn format_error(&self, error: &str) -> String {
        format!("{} {}", self.red("Error:"), error)
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn color_for_percent(&self, percent: f64, text: &str) -> String {
        if !self.use_colors {
            return text.to_string();
        }

        if percent < 20.0 {
            self.red(text)
        } else if percent < 50.0 {
            self.yellow(text)
        } else {
            self.green(text)
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    /// Bold text.
    pub fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    /// Dimmed text.
    pub fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

/// Formats reset time as countdown or absolute.
fn format_reset_time(resets_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if resets_at <= now {
        return "now".to_string();
    }

    let diff = resets_at - now;
    if diff < Duration::hours(1) {
        let mins = diff.num_minutes();
        format!("in {} minute{}", mins, if mins == 1 { "" } else { "s" })
    } else if diff < Duration::hours(24) {
        let hours = diff.num_hours();
        let mins = diff.num_minutes() % 60;
        if mins > 0 {
            format!("in {hours}h {mins}m")
        } else {
            format!("in {} hour{}", hours, if hours == 1 { "" } else { "s" })
        }
    } else {
        let local_reset = resets_at.with_timezone(&Local);
        local_reset.format("%a at %l:%M %p").to_string().trim().to_string()
    }
}

/// Formats an age as "just now", "5m ago", "3h ago".
fn format_ago(age: Duration) -> String {
    if age < Duration::minutes(1) {
        "just now".to_string()
    } else if age < Duration::hours(1) {
        format!("{}m ago", age.num_minutes())
    } else if age < Duration::days(1) {
        format!("{}h ago", age.num_hours())
    } else {
        format!("{}d ago", age.num_days())
    }
}

// ============================================================================
// Tests
// ============================================================================
