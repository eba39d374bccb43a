//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use quotabar_core::{Credits, IncidentSeverity, ProviderKind, UsageWindow};
use quotabar_engine::{
    Freshness, Notification, NotificationCategory, PaceProjection, PaceStage, ProviderState,
    project,
};
use serde::{Serialize, Serializer};

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for a single provider.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOutput {
    pub provider: String,
    pub enabled: bool,
    pub freshness: Freshness,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_datetime_opt")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<CreditsOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Status indicator.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutput {
    pub indicator: IncidentSeverity,
    pub description: String,
}

/// Usage windows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<WindowOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<WindowOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tertiary: Option<WindowOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
}

/// A single usage window.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowOutput {
    pub used_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_datetime_opt")]
    pub resets_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pace: Option<PaceOutput>,
}

/// Pace projection for a window.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaceOutput {
    pub stage: PaceStage,
    pub expected_percent: f64,
    pub delta_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<f64>,
    pub lasts_until_reset: bool,
}

/// Credits info.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsOutput {
    pub remaining: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_percent: Option<f64>,
    pub unit: String,
}

/// Provider list entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfoOutput {
    pub id: String,
    pub display_name: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub available: bool,
}

/// A raised notification.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOutput {
    pub provider: String,
    pub category: NotificationCategory,
    pub title: String,
    pub body: String,
}

// ============================================================================
// Serialization helpers
// ============================================================================

#[allow(clippy::ref_option)]
fn serialize_datetime_opt<S>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => s.serialize_str(&dt.to_rfc3339()),
        None => s.serialize_none(),
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats provider states. A single state is printed as an object.
    pub fn format_states(
        &self,
        states: &[ProviderState],
        refresh_interval_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let outputs: Vec<ProviderOutput> = states
            .iter()
            .map(|state| state_to_output(state, refresh_interval_seconds, now))
            .collect();

        if let [single] = outputs.as_slice() {
            self.format(single)
        } else {
            self.format(&outputs)
        }
    }

    /// Formats raised notifications.
    pub fn format_notifications(&self, notifications: &[Notification]) -> Result<String> {
        let outputs: Vec<NotificationOutput> = notifications
            .iter()
            .map(|n| NotificationOutput {
                provider: n.provider.cli_name().to_string(),
                category: n.category,
                title: n.title.clone(),
                body: n.body.clone(),
            })
            .collect();
        self.format(&outputs)
    }

    /// Formats the provider list.
    pub fn format_providers(&self, providers: &[ProviderInfoOutput]) -> Result<String> {
        self.format(&providers)
    }
}

/// Builds the JSON view of one provider.
pub fn state_to_output(
    state: &ProviderState,
    refresh_interval_seconds: i64,
    now: DateTime<Utc>,
) -> ProviderOutput {
    let usage = state.usage.as_ref().map(|snapshot| UsageOutput {
        primary: snapshot.primary.as_ref().map(|w| window_to_output(w, now)),
        secondary: snapshot.secondary.as_ref().map(|w| window_to_output(w, now)),
        tertiary: snapshot.tertiary.as_ref().map(|w| window_to_output(w, now)),
        account_email: snapshot
            .identity
            .as_ref()
            .and_then(|id| id.account_email.clone()),
        plan_name: snapshot.identity.as_ref().and_then(|id| id.plan_name.clone()),
    });

    ProviderOutput {
        provider: state.id.cli_name().to_string(),
        enabled: state.enabled,
        freshness: Freshness::classify(state.updated_at(), refresh_interval_seconds, now),
        updated_at: state.updated_at(),
        status: state.status.as_ref().map(|incident| StatusOutput {
            indicator: incident.severity,
            description: incident.summary.clone(),
        }),
        usage,
        credits: state
            .usage
            .as_ref()
            .and_then(|u| u.credits.as_ref())
            .map(credits_to_output),
        error: state.last_error.clone(),
    }
}

/// Builds the list entry for one provider.
pub fn provider_info(
    kind: ProviderKind,
    enabled: bool,
    command: Option<String>,
    available: bool,
) -> ProviderInfoOutput {
    ProviderInfoOutput {
        id: kind.cli_name().to_string(),
        display_name: kind.display_name().to_string(),
        enabled,
        command,
        available,
    }
}

fn window_to_output(window: &UsageWindow, now: DateTime<Utc>) -> WindowOutput {
    WindowOutput {
        used_percent: window.clamped_percent(),
        window_minutes: window.window_minutes,
        resets_at: window.resets_at,
        pace: project(window, now).map(|p| pace_to_output(&p)),
    }
}

fn pace_to_output(pace: &PaceProjection) -> PaceOutput {
    PaceOutput {
        stage: pace.stage,
        expected_percent: pace.expected_percent,
        delta_percent: pace.delta_percent,
        eta_seconds: pace.eta_seconds,
        lasts_until_reset: pace.lasts_until_reset,
    }
}

fn credits_to_output(credits: &Credits) -> CreditsOutput {
    CreditsOutput {
        remaining: credits.remaining,
        total: credits.valid_total(),
        remaining_percent: credits.remaining_percent(),
        unit: credits.unit.clone(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pretty() {
        let formatter = JsonFormatter::new(true);
        let data = serde_json::json!({"key": "value"});
        let output = formatter.format(&data).unwrap();
        assert!(output.contains('\n'));
    }

    #[test]
    fn test_format_compact() {
        let formatter = JsonFormatter::new(false);
        let data = serde_json::json!({"key": "value"});
        let output = formatter.format(&data).unwrap();
        assert!(!output.contains('\n'));
    }

    #[test]
    fn test_window_output_clamps() {
        let output = window_to_output(&UsageWindow::new(130.0), Utc::now());
        assert!((output.used_percent - 100.0).abs() < f64::EPSILON);
        assert!(output.pace.is_none());
    }

    #[test]
    fn test_credits_output_drops_invalid_total() {
        let output = credits_to_output(&Credits::new(5.0).with_total(0.0));
        assert!(output.total.is_none());
        assert!(output.remaining_percent.is_none());
    }
}
