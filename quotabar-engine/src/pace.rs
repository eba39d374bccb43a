//! Pace projection.
//!
//! Compares how much of a window has been used with how much would have
//! been used if consumption were spread evenly, and projects when the
//! window runs out at the current rate. Pure; safe to call every render.

use chrono::{DateTime, Utc};
use quotabar_core::UsageWindow;
use serde::Serialize;

use crate::notifications::format_age;

/// Below this expected usage the cycle is too young to judge.
pub const MIN_EXPECTED_PERCENT: f64 = 3.0;

/// Deltas within this many points count as on pace.
pub const ON_PACE_TOLERANCE: f64 = 2.0;

/// Where consumption sits relative to an even spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaceStage {
    /// Within the tolerance band.
    OnPace,
    /// Consuming faster than an even spread.
    Ahead,
    /// Consuming slower than an even spread.
    Behind,
}

/// Result of [`project`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaceProjection {
    /// Ahead, behind or on pace.
    pub stage: PaceStage,
    /// Clamped actual used percent.
    pub actual_percent: f64,
    /// Used percent an even spread would have reached by now.
    pub expected_percent: f64,
    /// `actual - expected`.
    pub delta_percent: f64,
    /// Minutes until the window resets.
    pub minutes_remaining: f64,
    /// Seconds until the window is exhausted at the current rate.
    pub eta_seconds: Option<f64>,
    /// Current rate does not exhaust the window before it resets.
    pub lasts_until_reset: bool,
}

impl PaceProjection {
    /// Short label, e.g. `"12% ahead, runs out in 3h 5m"`.
    pub fn summary(&self) -> String {
        let pace = match self.stage {
            PaceStage::OnPace => "On pace".to_string(),
            PaceStage::Ahead => format!("{:.0}% ahead", self.delta_percent.abs()),
            PaceStage::Behind => format!("{:.0}% behind", self.delta_percent.abs()),
        };

        if self.lasts_until_reset {
            format!("{pace}, lasts until reset")
        } else if let Some(eta) = self.eta_seconds {
            #[allow(clippy::cast_possible_truncation)]
            let eta = chrono::Duration::seconds(eta.round() as i64);
            format!("{pace}, runs out in {}", format_age(eta))
        } else {
            pace
        }
    }
}

/// Projects pace for a window at `now`.
///
/// Returns `None` when the window lacks a reset time or length, has
/// already reset, reports more time left than its own length, or is too
/// early in its cycle.
pub fn project(window: &UsageWindow, now: DateTime<Utc>) -> Option<PaceProjection> {
    let resets_at = window.resets_at?;
    let window_minutes = f64::from(window.window_minutes.filter(|&m| m > 0)?);

    #[allow(clippy::cast_precision_loss)]
    let minutes_remaining = ((resets_at - now).num_milliseconds() as f64 / 60_000.0).max(0.0);
    if minutes_remaining <= 0.0 || minutes_remaining > window_minutes {
        return None;
    }

    let elapsed_minutes = window_minutes - minutes_remaining;
    let expected_percent = elapsed_minutes / window_minutes * 100.0;
    if expected_percent < MIN_EXPECTED_PERCENT {
        return None;
    }

    let actual_percent = window.clamped_percent();
    let delta_percent = actual_percent - expected_percent;
    let stage = if delta_percent.abs() <= ON_PACE_TOLERANCE {
        PaceStage::OnPace
    } else if delta_percent > 0.0 {
        PaceStage::Ahead
    } else {
        PaceStage::Behind
    };

    let (eta_seconds, lasts_until_reset) = eta(actual_percent, elapsed_minutes, minutes_remaining);

    Some(PaceProjection {
        stage,
        actual_percent,
        expected_percent,
        delta_percent,
        minutes_remaining,
        eta_seconds,
        lasts_until_reset,
    })
}

/// Linear time-to-exhaustion.
fn eta(actual_percent: f64, elapsed_minutes: f64, minutes_remaining: f64) -> (Option<f64>, bool) {
    if actual_percent <= 0.0 && elapsed_minutes > 0.0 {
        return (None, true);
    }

    let elapsed_seconds = elapsed_minutes * 60.0;
    let rate = actual_percent / elapsed_seconds;
    if !rate.is_finite() || rate <= 0.0 {
        return (None, false);
    }

    // (100 - actual) / rate, rearranged to stay exact for whole numbers.
    let candidate = (100.0 - actual_percent) * elapsed_seconds / actual_percent;
    if candidate >= minutes_remaining * 60.0 {
        (None, true)
    } else {
        (Some(candidate), false)
    }
}
