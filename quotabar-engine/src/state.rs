//! Per-provider refresh state.

use chrono::{DateTime, Utc};
use quotabar_core::{Incident, ProviderKind, UsageSnapshot};
use serde::Serialize;

/// Mutable record for one provider, owned by the orchestrator.
///
/// Created for every known provider at startup and never removed.
/// `usage` and `last_error` are replaced together when an attempt
/// completes; a failed attempt leaves the previous `usage` in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderState {
    /// Provider id.
    pub id: ProviderKind,
    /// Included in refresh-all passes.
    pub enabled: bool,
    /// Last snapshot the adapter returned.
    pub usage: Option<UsageSnapshot>,
    /// A refresh is in flight.
    pub is_loading: bool,
    /// Error from the most recent attempt.
    pub last_error: Option<String>,
    /// Service incident, if one is known.
    pub status: Option<Incident>,
    /// When the most recent attempt finished.
    pub last_attempt: Option<DateTime<Utc>>,
}

impl ProviderState {
    /// Creates the initial, disabled state.
    pub fn new(id: ProviderKind) -> Self {
        Self {
            id,
            enabled: false,
            usage: None,
            is_loading: false,
            last_error: None,
            status: None,
            last_attempt: None,
        }
    }

    /// `updated_at` of the last known snapshot.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.usage.as_ref().map(|u| u.updated_at)
    }

    /// Returns true if the last attempt left an error behind.
    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }

    /// Phase of the refresh state machine.
    pub fn phase(&self) -> RefreshPhase {
        if self.is_loading {
            RefreshPhase::Loading
        } else if self.last_attempt.is_none() {
            RefreshPhase::Idle
        } else if self.last_error.is_some() {
            RefreshPhase::Failed
        } else {
            RefreshPhase::Succeeded
        }
    }
}

/// Where a provider sits in `Idle -> Loading -> {Succeeded, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPhase {
    /// Never refreshed.
    Idle,
    /// Fetch in flight.
    Loading,
    /// Last attempt produced data without an error.
    Succeeded,
    /// Last attempt failed or carried an error.
    Failed,
}
