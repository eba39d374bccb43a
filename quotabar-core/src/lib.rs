// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `QuotaBar` Core
//!
//! Core types and models shared by every `QuotaBar` crate.
//!
//! ## Key Types
//!
//! ### Provider Types
//! - [`ProviderKind`] - Enum of all supported usage providers
//! - [`ProviderIdentity`] - Account identity (siloed per provider)
//!
//! ### Usage Types
//! - [`UsageSnapshot`] - One normalized reading with up to three windows
//! - [`UsageWindow`] - Individual rate window (session, weekly, tier)
//! - [`Credits`] - Credit-based usage tracking
//! - [`ProviderCost`] - Spend against a budget
//!
//! ### Status
//! - [`Incident`] - Service incident reported for a provider

pub mod error;
pub mod models;

pub use error::CoreError;

pub use models::{
    // Provider types
    LoginMethod,
    ProviderIdentity,
    ProviderKind,
    // Usage types
    clamp_percent,
    Credits,
    ProviderCost,
    UsageSnapshot,
    UsageWindow,
    // Status
    Incident,
    IncidentSeverity,
};

/// Parses a provider from its CLI name.
///
/// # Errors
///
/// Returns [`CoreError::UnknownProvider`] if no provider has that name.
pub fn parse_provider(name: &str) -> Result<ProviderKind, CoreError> {
    ProviderKind::from_cli_name(name).ok_or_else(|| CoreError::UnknownProvider(name.to_string()))
}
