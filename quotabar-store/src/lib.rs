// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # QuotaBar Store
//!
//! Settings and persistence for QuotaBar.
//!
//! - **SettingsStore**: User preferences with persistence and change notification
//! - **Persistence**: JSON file helpers with owner-only permissions
//!
//! ## Usage
//!
//! ```ignore
//! use quotabar_store::SettingsStore;
//!
//! let settings = SettingsStore::load_default().await?;
//! let mut rx = settings.subscribe();
//! settings.set_provider_enabled(ProviderKind::Claude, true).await;
//! settings.save().await?;
//! ```

pub mod error;
pub mod persistence;
pub mod settings_store;

pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_settings_path, ensure_dir, load_json, load_json_or_default,
    save_json,
};
pub use settings_store::{
    LogLevel, NotificationSettings, ProviderSettings, RefreshCadence, Settings, SettingsStore,
};
