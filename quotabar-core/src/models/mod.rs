//! Domain models for QuotaBar.
//!
//! ## Submodules
//!
//! - [`provider`] - Provider types (ProviderKind, Identity)
//! - [`usage`] - Usage types (UsageSnapshot, UsageWindow, Credits, ProviderCost)
//! - [`status`] - Service incidents

mod provider;
mod status;
mod usage;

pub use provider::{LoginMethod, ProviderIdentity, ProviderKind};
pub use status::{Incident, IncidentSeverity};
pub use usage::{clamp_percent, Credits, ProviderCost, UsageSnapshot, UsageWindow};
