//! Provider service incidents.
//!
//! - [`Incident`] - Service health reported alongside usage
//! - [`IncidentSeverity`] - Severity levels, ordered

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A service incident attached to a provider (from its status page).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// How bad it is.
    pub severity: IncidentSeverity,
    /// Human-readable summary.
    pub summary: String,
    /// When the status page last updated this incident.
    pub updated_at: DateTime<Utc>,
    /// Link to the status page.
    #[serde(default)]
    pub url: Option<String>,
}

impl Incident {
    /// Creates a new incident observed now.
    pub fn new(severity: IncidentSeverity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            updated_at: Utc::now(),
            url: None,
        }
    }

    /// Returns true if this incident degrades the service.
    pub fn is_disruptive(&self) -> bool {
        matches!(
            self.severity,
            IncidentSeverity::Minor | IncidentSeverity::Major | IncidentSeverity::Critical
        )
    }
}

/// Incident severity, from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    /// Scheduled maintenance.
    Maintenance,
    /// Degraded performance.
    Minor,
    /// Partial outage.
    Major,
    /// Major outage.
    Critical,
}

impl IncidentSeverity {
    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Maintenance => "Under Maintenance",
            Self::Minor => "Degraded",
            Self::Major => "Partial Outage",
            Self::Critical => "Major Outage",
        }
    }
}

impl std::fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(IncidentSeverity::Critical > IncidentSeverity::Major);
        assert!(IncidentSeverity::Minor > IncidentSeverity::Maintenance);
    }

    #[test]
    fn test_disruptive() {
        assert!(Incident::new(IncidentSeverity::Major, "API errors").is_disruptive());
        assert!(!Incident::new(IncidentSeverity::Maintenance, "DB upgrade").is_disruptive());
    }
}
