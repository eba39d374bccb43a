//! Session quota rule.
//!
//! One-shot rising edge per threshold per quota cycle on the primary
//! window's used percent.

use chrono::{DateTime, Utc};
use quotabar_core::{ProviderKind, UsageWindow};
use std::collections::BTreeSet;
use tracing::debug;

use super::{Notification, NotificationCategory};

/// Used-percent thresholds, ascending.
pub const SESSION_THRESHOLDS: [u8; 2] = [80, 90];

/// A drop of at least this many points counts as a quota reset even
/// when the reset marker did not change.
pub const SESSION_RESET_DROP_POINTS: f64 = 5.0;

/// Per-provider session rule state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionNotificationState {
    /// Clamped percent seen last time.
    pub last_percent: f64,
    /// Thresholds already fired this cycle.
    pub triggered: BTreeSet<u8>,
    /// `resets_at` seen last time.
    pub reset_marker: Option<DateTime<Utc>>,
}

/// Evaluates one primary-window observation.
///
/// While `enabled` is false nothing fires and the state does not move.
/// A missing window is no signal.
pub fn evaluate(
    provider: ProviderKind,
    previous: Option<&SessionNotificationState>,
    window: Option<&UsageWindow>,
    enabled: bool,
) -> (Option<SessionNotificationState>, Vec<Notification>) {
    let Some(window) = window.filter(|_| enabled) else {
        return (previous.cloned(), Vec::new());
    };

    let current = window.clamped_percent();
    let mut next = previous.cloned().unwrap_or_default();
    let baseline = next.last_percent;

    let rolled_over = matches!(
        (next.reset_marker, window.resets_at),
        (Some(stored), Some(seen)) if stored != seen
    );
    let dropped = previous.is_some() && baseline - current >= SESSION_RESET_DROP_POINTS;

    if rolled_over || dropped {
        debug!(provider = ?provider, rolled_over, dropped, "Session quota reset");
        next.triggered.clear();
    }

    let mut fired = Vec::new();
    for threshold in SESSION_THRESHOLDS {
        let t = f64::from(threshold);
        if current >= t && baseline < t && next.triggered.insert(threshold) {
            fired.push(notification(provider, threshold, current));
        }
    }

    next.last_percent = current;
    next.reset_marker = window.resets_at;
    (Some(next), fired)
}

fn notification(provider: ProviderKind, threshold: u8, percent: f64) -> Notification {
    let name = provider.display_name();
    let title = if threshold >= 90 {
        format!("{name} session almost exhausted")
    } else {
        format!("{name} session quota at {threshold}%")
    };
    Notification {
        provider,
        category: NotificationCategory::SessionQuota,
        title,
        body: format!("You've used {percent:.0}% of your current {name} session."),
    }
}
