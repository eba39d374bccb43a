//! User preferences store.
//!
//! Manages user settings with persistence and change notification.

use quotabar_core::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{default_settings_path, load_json, save_json};

// ============================================================================
// Settings Types
// ============================================================================

/// User preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Providers included in refresh-all passes.
    pub enabled_providers: BTreeSet<ProviderKind>,

    /// Auto-refresh cadence.
    pub refresh_cadence: RefreshCadence,

    /// Alert toggles.
    pub notifications: NotificationSettings,

    /// Per-provider adapter settings.
    pub provider_settings: BTreeMap<ProviderKind, ProviderSettings>,

    /// Log level.
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled_providers: [ProviderKind::Codex, ProviderKind::Claude].into_iter().collect(),
            refresh_cadence: RefreshCadence::default(),
            notifications: NotificationSettings::default(),
            provider_settings: BTreeMap::new(),
            log_level: LogLevel::default(),
        }
    }
}

impl Settings {
    /// Refresh interval in seconds; 0 means manual.
    pub fn refresh_interval_seconds(&self) -> i64 {
        self.refresh_cadence.seconds()
    }

    /// Returns true if the provider is enabled.
    pub fn is_provider_enabled(&self, provider: ProviderKind) -> bool {
        self.enabled_providers.contains(&provider)
    }
}

/// Notification toggles.
///
/// A category emits only when both `enabled` and its own flag are true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct NotificationSettings {
    /// Global switch.
    pub enabled: bool,
    /// Session quota crossing alerts.
    pub session_quota: bool,
    /// Credits-low alerts.
    pub credits_low: bool,
    /// Refresh failure alerts.
    pub refresh_failure: bool,
    /// Stale data alerts.
    pub stale_usage: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            session_quota: true,
            credits_low: true,
            refresh_failure: true,
            stale_usage: true,
        }
    }
}

impl NotificationSettings {
    /// Everything switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            session_quota: false,
            credits_low: false,
            refresh_failure: false,
            stale_usage: false,
        }
    }
}

/// Adapter settings for one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Command that prints a JSON usage snapshot.
    pub command: Option<String>,
    /// Arguments for `command`.
    pub args: Vec<String>,
    /// Command timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl ProviderSettings {
    /// Returns the command timeout, if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Refresh cadence options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshCadence {
    /// Manual refresh only.
    Manual,
    /// Every minute.
    OneMinute,
    /// Every two minutes.
    #[default]
    TwoMinutes,
    /// Every five minutes.
    FiveMinutes,
    /// Every fifteen minutes.
    FifteenMinutes,
    /// Every thirty minutes.
    ThirtyMinutes,
}

impl RefreshCadence {
    /// Interval in seconds, 0 for manual.
    pub fn seconds(&self) -> i64 {
        match self {
            RefreshCadence::Manual => 0,
            RefreshCadence::OneMinute => 60,
            RefreshCadence::TwoMinutes => 120,
            RefreshCadence::FiveMinutes => 300,
            RefreshCadence::FifteenMinutes => 900,
            RefreshCadence::ThirtyMinutes => 1800,
        }
    }

    /// Returns the duration, or None for manual.
    pub fn as_duration(&self) -> Option<Duration> {
        u64::try_from(self.seconds())
            .ok()
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }

    /// Picks the cadence closest to `seconds` (0 or less is manual).
    pub fn from_seconds(seconds: i64) -> Self {
        if seconds <= 0 {
            return RefreshCadence::Manual;
        }
        Self::all()
            .iter()
            .copied()
            .filter(|c| *c != RefreshCadence::Manual)
            .min_by_key(|c| (c.seconds() - seconds).abs())
            .unwrap_or_default()
    }

    /// All available cadences.
    pub fn all() -> &'static [RefreshCadence] {
        &[
            RefreshCadence::Manual,
            RefreshCadence::OneMinute,
            RefreshCadence::TwoMinutes,
            RefreshCadence::FiveMinutes,
            RefreshCadence::FifteenMinutes,
            RefreshCadence::ThirtyMinutes,
        ]
    }
}

impl std::fmt::Display for RefreshCadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshCadence::Manual => write!(f, "Manual"),
            RefreshCadence::OneMinute => write!(f, "1 minute"),
            RefreshCadence::TwoMinutes => write!(f, "2 minutes"),
            RefreshCadence::FiveMinutes => write!(f, "5 minutes"),
            RefreshCadence::FifteenMinutes => write!(f, "15 minutes"),
            RefreshCadence::ThirtyMinutes => write!(f, "30 minutes"),
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error level logging.
    Error,
    /// Warning level logging.
    #[default]
    Warn,
    /// Info level logging.
    Info,
    /// Debug level logging.
    Debug,
    /// Trace level logging.
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Persistent settings store with change notifications.
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
    notify: watch::Sender<u64>,
}

impl SettingsStore {
    /// Creates a store holding defaults, persisted at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self::with_settings(path, Settings::default())
    }

    /// Creates a store holding `settings`, persisted at `path`.
    pub fn with_settings(path: PathBuf, settings: Settings) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            settings: Arc::new(RwLock::new(settings)),
            path,
            notify,
        }
    }

    /// Loads settings from the default path.
    ///
    /// # Errors
    ///
    /// Currently infallible; a missing or corrupt file yields defaults.
    pub async fn load_default() -> Result<Self, StoreError> {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from a path.
    ///
    /// A missing file yields defaults; a corrupt file is logged and also
    /// yields defaults so a bad edit never keeps the monitor from starting.
    ///
    /// # Errors
    ///
    /// Currently infallible.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let settings = if path.exists() {
            info!(path = %path.display(), "Loading settings");
            load_json(&path).await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to load settings, using defaults");
                Settings::default()
            })
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            Settings::default()
        };

        Ok(Self::with_settings(path, settings))
    }

    /// Path this store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Updates settings and notifies subscribers.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        {
            let mut settings = self.settings.write().await;
            f(&mut settings);
        }
        self.notify.send_modify(|version| *version += 1);
    }

    /// Saves settings to disk.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be written to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await.clone();
        save_json(&self.path, &settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    /// Subscribes to settings changes (version counter).
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    // ========================================================================
    // Convenience Methods
    // ========================================================================

    /// Checks if a provider is enabled.
    pub async fn is_provider_enabled(&self, provider: ProviderKind) -> bool {
        self.settings.read().await.is_provider_enabled(provider)
    }

    /// Enables or disables a provider.
    pub async fn set_provider_enabled(&self, provider: ProviderKind, enabled: bool) {
        self.update(|s| {
            if enabled {
                s.enabled_providers.insert(provider);
            } else {
                s.enabled_providers.remove(&provider);
            }
        })
        .await;
        info!(provider = ?provider, enabled, "Provider enabled state changed");
    }

    /// Gets enabled providers.
    pub async fn enabled_providers(&self) -> BTreeSet<ProviderKind> {
        self.settings.read().await.enabled_providers.clone()
    }

    /// Gets the refresh cadence.
    pub async fn refresh_cadence(&self) -> RefreshCadence {
        self.settings.read().await.refresh_cadence
    }

    /// Sets the refresh cadence.
    pub async fn set_refresh_cadence(&self, cadence: RefreshCadence) {
        self.update(|s| s.refresh_cadence = cadence).await;
    }

    /// Refresh interval in seconds; 0 means manual.
    pub async fn refresh_interval_seconds(&self) -> i64 {
        self.settings.read().await.refresh_interval_seconds()
    }

    /// Gets the notification toggles.
    pub async fn notifications(&self) -> NotificationSettings {
        self.settings.read().await.notifications
    }

    /// Replaces the notification toggles.
    pub async fn set_notifications(&self, notifications: NotificationSettings) {
        self.update(|s| s.notifications = notifications).await;
    }

    /// Gets the adapter settings for a provider.
    pub async fn provider_settings(&self, provider: ProviderKind) -> ProviderSettings {
        self.settings
            .read()
            .await
            .provider_settings
            .get(&provider)
            .cloned()
            .unwrap_or_default()
    }

    /// Sets the command for a provider.
    pub async fn set_provider_command(
        &self,
        provider: ProviderKind,
        command: Option<String>,
        args: Vec<String>,
    ) {
        self.update(|s| {
            let entry = s.provider_settings.entry(provider).or_default();
            entry.command = command;
            entry.args = args;
        })
        .await;
    }
}
