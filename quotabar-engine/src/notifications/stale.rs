//! Stale usage rule.
//!
//! Fires once when the last known `updated_at` crosses the stale window.
//! The alert stays open for that timestamp until newer data shows up.

use chrono::{DateTime, Utc};
use quotabar_core::ProviderKind;

use super::{Notification, NotificationCategory, format_age};
use crate::staleness::is_stale;

/// Per-provider stale rule state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StaleUsageNotificationState {
    /// `updated_at` an alert has already been raised for.
    pub open_for: Option<DateTime<Utc>>,
}

/// Evaluates the last known `updated_at` against the wall clock.
///
/// While `enabled` is false nothing fires and the state does not move.
/// Providers with no data yet produce no signal.
pub fn evaluate(
    provider: ProviderKind,
    previous: Option<&StaleUsageNotificationState>,
    updated_at: Option<DateTime<Utc>>,
    stale_after_ms: i64,
    now: DateTime<Utc>,
    enabled: bool,
) -> (Option<StaleUsageNotificationState>, Vec<Notification>) {
    let Some(updated_at) = updated_at.filter(|_| enabled) else {
        return (previous.copied(), Vec::new());
    };

    if !is_stale(Some(updated_at), stale_after_ms, now) {
        return (Some(StaleUsageNotificationState { open_for: None }), Vec::new());
    }

    if previous.and_then(|s| s.open_for) == Some(updated_at) {
        return (previous.copied(), Vec::new());
    }

    let name = provider.display_name();
    let notification = Notification {
        provider,
        category: NotificationCategory::StaleUsage,
        title: format!("{name} usage is stale"),
        body: format!(
            "No fresh {name} data for {}. The numbers shown may be out of date.",
            format_age(now - updated_at)
        ),
    };
    (
        Some(StaleUsageNotificationState {
            open_for: Some(updated_at),
        }),
        vec![notification],
    )
}
