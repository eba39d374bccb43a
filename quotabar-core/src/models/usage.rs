//! Usage-related types.
//!
//! This module contains types related to usage tracking:
//! - [`UsageSnapshot`] - Main container with multiple windows
//! - [`UsageWindow`] - Individual rate window
//! - [`Credits`] - Credit-based systems
//! - [`ProviderCost`] - Spend against a budget

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::ProviderIdentity;

/// Clamps a raw percentage to `[0, 100]`, mapping non-finite values to 0.
///
/// Providers may report more than 100% used; consumers clamp before
/// display or alerting.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

// ============================================================================
// Usage Snapshot & Windows
// ============================================================================

/// A normalized usage reading from one provider.
///
/// - **Primary** = session window (e.g., 5 hours)
/// - **Secondary** = weekly/monthly window
/// - **Tertiary** = premium tier window
///
/// A snapshot with `error` set and no windows is a failed refresh that
/// produced no usable data. With `error` set and windows present it is a
/// partial success carrying stale values forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Primary usage window (session-based).
    #[serde(default)]
    pub primary: Option<UsageWindow>,
    /// Secondary usage window (weekly/monthly).
    #[serde(default)]
    pub secondary: Option<UsageWindow>,
    /// Tertiary usage window (premium tier).
    #[serde(default)]
    pub tertiary: Option<UsageWindow>,
    /// Credit balance, for credit-based providers.
    #[serde(default)]
    pub credits: Option<Credits>,
    /// Spend against a budget.
    #[serde(default)]
    pub cost: Option<ProviderCost>,
    /// Account identity for this provider.
    #[serde(default)]
    pub identity: Option<ProviderIdentity>,
    /// When the provider produced this reading.
    pub updated_at: DateTime<Utc>,
    /// Error embedded by the adapter (partial or total failure).
    #[serde(default)]
    pub error: Option<String>,
}

impl UsageSnapshot {
    /// Creates a new empty snapshot stamped now.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Creates a new empty snapshot stamped at `updated_at`.
    pub fn at(updated_at: DateTime<Utc>) -> Self {
        Self {
            primary: None,
            secondary: None,
            tertiary: None,
            credits: None,
            cost: None,
            identity: None,
            updated_at,
            error: None,
        }
    }

    /// Sets the primary window.
    #[must_use]
    pub fn with_primary(mut self, window: UsageWindow) -> Self {
        self.primary = Some(window);
        self
    }

    /// Sets the secondary window.
    #[must_use]
    pub fn with_secondary(mut self, window: UsageWindow) -> Self {
        self.secondary = Some(window);
        self
    }

    /// Sets the credit balance.
    #[must_use]
    pub fn with_credits(mut self, credits: Credits) -> Self {
        self.credits = Some(credits);
        self
    }

    /// Sets the embedded error.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Returns true if any rate window is present.
    pub fn has_data(&self) -> bool {
        self.primary.is_some() || self.secondary.is_some() || self.tertiary.is_some()
    }

    /// Returns true if the adapter failed and no usable data came back.
    pub fn is_failed(&self) -> bool {
        self.error.is_some() && !self.has_data()
    }

    /// Returns true if the adapter reported an error but still carried windows.
    pub fn is_partial(&self) -> bool {
        self.error.is_some() && self.has_data()
    }

    /// Returns the highest clamped usage percentage across all windows.
    pub fn max_usage_percent(&self) -> f64 {
        [&self.primary, &self.secondary, &self.tertiary]
            .into_iter()
            .flatten()
            .map(UsageWindow::clamped_percent)
            .fold(0.0_f64, f64::max)
    }

    /// Returns the age of this reading at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.updated_at
    }
}

impl Default for UsageSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// A single rate window (session, weekly, or tier).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageWindow {
    /// Percentage of quota used. Raw values may exceed 100.
    pub used_percent: f64,
    /// Window duration in minutes (300 = 5 hours, 10080 = 1 week).
    #[serde(default)]
    pub window_minutes: Option<u32>,
    /// Instant the quota resets to zero.
    #[serde(default)]
    pub resets_at: Option<DateTime<Utc>>,
    /// Human-readable reset description (e.g., "in 2 hours").
    #[serde(default)]
    pub reset_description: Option<String>,
    /// Label shown next to the bar (e.g., "Session", "Weekly").
    #[serde(default)]
    pub label: Option<String>,
}

impl UsageWindow {
    /// Creates a new usage window with the given percentage.
    pub fn new(used_percent: f64) -> Self {
        Self {
            used_percent,
            window_minutes: None,
            resets_at: None,
            reset_description: None,
            label: None,
        }
    }

    /// Sets the window length.
    #[must_use]
    pub fn with_window_minutes(mut self, minutes: u32) -> Self {
        self.window_minutes = Some(minutes);
        self
    }

    /// Sets the reset instant.
    #[must_use]
    pub fn with_resets_at(mut self, resets_at: DateTime<Utc>) -> Self {
        self.resets_at = Some(resets_at);
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns `used_percent` clamped to `[0, 100]`.
    pub fn clamped_percent(&self) -> f64 {
        clamp_percent(self.used_percent)
    }

    /// Returns the remaining percentage (100 - clamped used).
    pub fn remaining_percent(&self) -> f64 {
        100.0 - self.clamped_percent()
    }

    /// Returns true if usage is at or over the limit.
    pub fn is_over_limit(&self) -> bool {
        self.clamped_percent() >= 100.0
    }

    /// Returns the window duration.
    pub fn window_duration(&self) -> Option<Duration> {
        self.window_minutes.map(|m| Duration::minutes(i64::from(m)))
    }

    /// Returns time until reset at `now`, if known.
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.resets_at.map(|reset| reset - now)
    }
}

impl Default for UsageWindow {
    fn default() -> Self {
        Self::new(0.0)
    }
}

// ============================================================================
// Credits & Cost
// ============================================================================

/// Credit balance for providers that sell credits instead of quotas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credits {
    /// Remaining credits.
    pub remaining: f64,
    /// Total credits in the current grant, if known.
    #[serde(default)]
    pub total: Option<f64>,
    /// Unit label (e.g., "credits", "USD").
    #[serde(default = "default_credits_unit")]
    pub unit: String,
}

fn default_credits_unit() -> String {
    "credits".to_string()
}

impl Credits {
    /// Creates a credit balance with the given remaining amount.
    pub fn new(remaining: f64) -> Self {
        Self {
            remaining,
            total: None,
            unit: default_credits_unit(),
        }
    }

    /// Sets the total grant.
    #[must_use]
    pub fn with_total(mut self, total: f64) -> Self {
        self.total = Some(total);
        self
    }

    /// Returns the usable total: finite and strictly positive.
    pub fn valid_total(&self) -> Option<f64> {
        self.total.filter(|t| t.is_finite() && *t > 0.0)
    }

    /// Returns remaining as a clamped percentage of total.
    ///
    /// `None` when there is no meaningful total.
    pub fn remaining_percent(&self) -> Option<f64> {
        self.valid_total()
            .map(|total| clamp_percent(self.remaining / total * 100.0))
    }
}

/// Spend against a budget (e.g., monthly on-demand usage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCost {
    /// Amount spent in the period.
    pub used: f64,
    /// Budget cap, if any.
    #[serde(default)]
    pub limit: Option<f64>,
    /// ISO currency code.
    #[serde(default = "default_currency")]
    pub currency_code: String,
    /// Period label (e.g., "Monthly").
    #[serde(default)]
    pub period: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl ProviderCost {
    /// Returns spend as a clamped percentage of the limit.
    pub fn used_percent(&self) -> Option<f64> {
        self.limit
            .filter(|l| l.is_finite() && *l > 0.0)
            .map(|limit| clamp_percent(self.used / limit * 100.0))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(-10.0), 0.0);
        assert_eq!(clamp_percent(150.0), 100.0);
        assert_eq!(clamp_percent(f64::NAN), 0.0);
        assert_eq!(clamp_percent(f64::INFINITY), 0.0);
        assert_eq!(clamp_percent(42.5), 42.5);
    }

    #[test]
    fn test_window_keeps_raw_value() {
        let window = UsageWindow::new(120.0);
        assert_eq!(window.used_percent, 120.0);
        assert_eq!(window.clamped_percent(), 100.0);
        assert_eq!(window.remaining_percent(), 0.0);
        assert!(window.is_over_limit());
    }

    #[test]
    fn test_snapshot_failed_vs_partial() {
        let failed = UsageSnapshot::new().with_error("boom");
        assert!(failed.is_failed());
        assert!(!failed.is_partial());

        let partial = UsageSnapshot::new()
            .with_primary(UsageWindow::new(40.0))
            .with_error("weekly endpoint down");
        assert!(partial.is_partial());
        assert!(!partial.is_failed());

        assert!(!UsageSnapshot::new().is_failed());
    }

    #[test]
    fn test_snapshot_max_usage_is_clamped() {
        let mut snapshot = UsageSnapshot::new();
        snapshot.primary = Some(UsageWindow::new(50.0));
        snapshot.secondary = Some(UsageWindow::new(130.0));
        assert_eq!(snapshot.max_usage_percent(), 100.0);
    }

    #[test]
    fn test_credits_remaining_percent() {
        let credits = Credits::new(25.0).with_total(100.0);
        assert_eq!(credits.remaining_percent(), Some(25.0));

        assert_eq!(Credits::new(25.0).remaining_percent(), None);
        assert_eq!(Credits::new(25.0).with_total(0.0).remaining_percent(), None);
        assert_eq!(Credits::new(25.0).with_total(f64::NAN).remaining_percent(), None);
    }

    #[test]
    fn test_cost_used_percent() {
        let cost = ProviderCost {
            used: 30.0,
            limit: Some(120.0),
            currency_code: "USD".to_string(),
            period: None,
        };
        assert_eq!(cost.used_percent(), Some(25.0));
    }

    #[test]
    fn test_snapshot_deserialize_minimal() {
        let json = r#"{"updated_at":"2026-01-02T03:04:05Z","primary":{"used_percent":12.5}}"#;
        let snapshot: UsageSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.primary.unwrap().used_percent, 12.5);
        assert!(snapshot.error.is_none());
        assert!(snapshot.credits.is_none());
    }

    #[test]
    fn test_credits_default_unit() {
        let credits: Credits = serde_json::from_str(r#"{"remaining":5.0}"#).unwrap();
        assert_eq!(credits.unit, "credits");
    }
}
