//! Credits-low rule.
//!
//! Falling edge on remaining percent (`remaining / total`). Providers that
//! report no usable total produce no signal.

use quotabar_core::{Credits, ProviderKind};
use std::collections::BTreeSet;
use tracing::debug;

use super::{Notification, NotificationCategory};

/// Remaining-percent thresholds, evaluated in this order.
pub const CREDITS_THRESHOLDS: [u8; 2] = [20, 10];

/// A rise of at least this many points counts as a refill.
pub const CREDITS_RESET_RISE_POINTS: f64 = 5.0;

/// Per-provider credits rule state.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditsNotificationState {
    /// Remaining percent seen last time.
    pub last_percent: f64,
    /// Thresholds already fired this cycle.
    pub triggered: BTreeSet<u8>,
    /// `total` seen last time.
    pub last_total: Option<f64>,
}

impl Default for CreditsNotificationState {
    fn default() -> Self {
        Self {
            last_percent: 100.0,
            triggered: BTreeSet::new(),
            last_total: None,
        }
    }
}

/// Evaluates one credits observation.
///
/// While `enabled` is false nothing fires and the state does not move.
pub fn evaluate(
    provider: ProviderKind,
    previous: Option<&CreditsNotificationState>,
    credits: Option<&Credits>,
    enabled: bool,
) -> (Option<CreditsNotificationState>, Vec<Notification>) {
    let unchanged = || (previous.cloned(), Vec::new());
    if !enabled {
        return unchanged();
    }
    let Some(credits) = credits else {
        return unchanged();
    };
    let (Some(total), Some(current)) = (credits.valid_total(), credits.remaining_percent()) else {
        return unchanged();
    };

    let mut next = previous.cloned().unwrap_or_default();
    let mut baseline = next.last_percent;

    #[allow(clippy::float_cmp)]
    let resized = next.last_total.is_some_and(|t| t != total);
    let refilled = previous.is_some() && current - baseline >= CREDITS_RESET_RISE_POINTS;

    if resized || refilled {
        debug!(provider = ?provider, resized, refilled, "Credits re-armed");
        next.triggered.clear();
    }
    if resized {
        baseline = 100.0;
    }

    let mut fired = Vec::new();
    for threshold in CREDITS_THRESHOLDS {
        let t = f64::from(threshold);
        if current <= t && baseline > t && next.triggered.insert(threshold) {
            fired.push(notification(provider, threshold, credits));
        }
    }

    next.last_percent = current;
    next.last_total = Some(total);
    (Some(next), fired)
}

fn notification(provider: ProviderKind, threshold: u8, credits: &Credits) -> Notification {
    let name = provider.display_name();
    Notification {
        provider,
        category: NotificationCategory::CreditsLow,
        title: format!("{name} credits below {threshold}%"),
        body: format!(
            "{:.0} {} left on your {name} account.",
            credits.remaining, credits.unit
        ),
    }
}
