//! Quota alerts.
//!
//! Four independent evaluators, each a pure transition over its own
//! per-provider state:
//!
//! - [`session`] - primary window crossing 80% / 90% used
//! - [`credits`] - credits falling to 20% / 10% remaining
//! - [`failure`] - a provider starting to fail
//! - [`stale`] - last known data going stale
//!
//! [`NotificationEngine`] owns the four state maps, applies the
//! enable/disable gate, and hands back the notifications to send. Sending
//! is the caller's job (see [`sink`]).

pub mod credits;
pub mod failure;
pub mod session;
pub mod sink;
pub mod stale;

use chrono::{DateTime, Utc};
use quotabar_core::ProviderKind;
use quotabar_store::NotificationSettings;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::refresh::RefreshOutcome;
use crate::staleness::stale_after_ms;
use crate::state::ProviderState;

pub use credits::{CREDITS_RESET_RISE_POINTS, CREDITS_THRESHOLDS, CreditsNotificationState};
pub use failure::RefreshFailureNotificationState;
pub use session::{SESSION_RESET_DROP_POINTS, SESSION_THRESHOLDS, SessionNotificationState};
pub use sink::{DesktopSink, LogSink, NotificationSink, RecordingSink};
pub use stale::StaleUsageNotificationState;

// ============================================================================
// Notification
// ============================================================================

/// Alert category, each with its own toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// Session quota crossed a used-percent threshold.
    SessionQuota,
    /// Credits fell below a remaining-percent threshold.
    CreditsLow,
    /// A provider started failing.
    RefreshFailure,
    /// Last known data went stale.
    StaleUsage,
}

impl NotificationCategory {
    /// Returns true if both the global switch and this category are on.
    pub fn is_enabled(self, settings: &NotificationSettings) -> bool {
        settings.enabled
            && match self {
                Self::SessionQuota => settings.session_quota,
                Self::CreditsLow => settings.credits_low,
                Self::RefreshFailure => settings.refresh_failure,
                Self::StaleUsage => settings.stale_usage,
            }
    }
}

/// One alert, ready to hand to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Provider the alert is about.
    pub provider: ProviderKind,
    /// Which rule fired.
    pub category: NotificationCategory,
    /// Short title.
    pub title: String,
    /// Message body.
    pub body: String,
}

// ============================================================================
// Notification Engine
// ============================================================================

/// Owns evaluator state and runs the evaluators.
///
/// State is memory only. Dropping the engine re-arms every threshold
/// against the next reading.
#[derive(Debug, Default)]
pub struct NotificationEngine {
    session: BTreeMap<ProviderKind, SessionNotificationState>,
    credits: BTreeMap<ProviderKind, CreditsNotificationState>,
    failure: BTreeMap<ProviderKind, RefreshFailureNotificationState>,
    stale: BTreeMap<ProviderKind, StaleUsageNotificationState>,
}

fn apply<S>(map: &mut BTreeMap<ProviderKind, S>, provider: ProviderKind, next: Option<S>) {
    match next {
        Some(state) => {
            map.insert(provider, state);
        }
        None => {
            map.remove(&provider);
        }
    }
}

impl NotificationEngine {
    /// Creates an engine with no state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates the refresh-driven rules after a refresh attempt.
    ///
    /// Session and credits rules only look at snapshots the adapter
    /// actually returned; a failed fetch feeds the failure rule alone.
    pub fn on_refresh(
        &mut self,
        state: &ProviderState,
        outcome: &RefreshOutcome,
        settings: &NotificationSettings,
    ) -> Vec<Notification> {
        if !outcome.applied() {
            return Vec::new();
        }
        let provider = state.id;
        let mut out = Vec::new();

        if !outcome.is_failed() {
            let usage = state.usage.as_ref();

            let (next, fired) = session::evaluate(
                provider,
                self.session.get(&provider),
                usage.and_then(|u| u.primary.as_ref()),
                NotificationCategory::SessionQuota.is_enabled(settings),
            );
            apply(&mut self.session, provider, next);
            out.extend(fired);

            let (next, fired) = credits::evaluate(
                provider,
                self.credits.get(&provider),
                usage.and_then(|u| u.credits.as_ref()),
                NotificationCategory::CreditsLow.is_enabled(settings),
            );
            apply(&mut self.credits, provider, next);
            out.extend(fired);
        }

        let (next, fired) = failure::evaluate(
            provider,
            self.failure.get(&provider),
            state.last_error.as_deref(),
            NotificationCategory::RefreshFailure.is_enabled(settings),
        );
        apply(&mut self.failure, provider, next);
        out.extend(fired);

        if !out.is_empty() {
            info!(provider = ?provider, count = out.len(), "Notifications raised");
        }
        out
    }

    /// Runs the stale rule over every provider with data.
    ///
    /// Called from its own timer, independent of refreshes in flight.
    pub fn on_stale_tick(
        &mut self,
        states: &[ProviderState],
        refresh_interval_seconds: i64,
        settings: &NotificationSettings,
        now: DateTime<Utc>,
    ) -> Vec<Notification> {
        let window = stale_after_ms(refresh_interval_seconds);
        let enabled = NotificationCategory::StaleUsage.is_enabled(settings);
        debug!(stale_after_ms = window, enabled, "Checking for stale usage");

        let mut out = Vec::new();
        for state in states.iter().filter(|s| s.enabled) {
            let (next, fired) = stale::evaluate(
                state.id,
                self.stale.get(&state.id),
                state.updated_at(),
                window,
                now,
                enabled,
            );
            apply(&mut self.stale, state.id, next);
            out.extend(fired);
        }
        out
    }

    /// Session rule state for a provider.
    pub fn session_state(&self, provider: ProviderKind) -> Option<&SessionNotificationState> {
        self.session.get(&provider)
    }

    /// Credits rule state for a provider.
    pub fn credits_state(&self, provider: ProviderKind) -> Option<&CreditsNotificationState> {
        self.credits.get(&provider)
    }

    /// Failure rule state for a provider.
    pub fn failure_state(
        &self,
        provider: ProviderKind,
    ) -> Option<&RefreshFailureNotificationState> {
        self.failure.get(&provider)
    }

    /// Stale rule state for a provider.
    pub fn stale_state(&self, provider: ProviderKind) -> Option<&StaleUsageNotificationState> {
        self.stale.get(&provider)
    }

    /// Forgets everything, re-arming all thresholds.
    pub fn reset(&mut self) {
        self.session.clear();
        self.credits.clear();
        self.failure.clear();
        self.stale.clear();
    }
}

/// Renders an age like `"12m"` or `"3h 5m"`.
pub fn format_age(age: chrono::Duration) -> String {
    let minutes = age.num_minutes().max(0);
    if minutes < 60 {
        format!("{minutes}m")
    } else if minutes < 60 * 24 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("{}d {}h", minutes / (60 * 24), (minutes / 60) % 24)
    }
}
