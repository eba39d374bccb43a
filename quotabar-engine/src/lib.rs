// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # QuotaBar Engine
//!
//! Refresh orchestration and the quota alert engine.
//!
//! - [`staleness`] - Shared fresh/stale policy
//! - [`refresh::RefreshOrchestrator`] - Concurrent, timeout-bounded refreshes
//!   and per-provider state
//! - [`notifications::NotificationEngine`] - Session, credits, failure and
//!   stale alerts with hysteresis
//! - [`pace`] - Ahead/behind pace and time-to-exhaustion
//! - [`monitor::Monitor`] - Event loop tying it together
//!
//! ## Example
//!
//! ```ignore
//! let orchestrator = Arc::new(RefreshOrchestrator::new(Arc::new(registry)));
//! let (monitor, handle) = Monitor::new(orchestrator, settings, Arc::new(DesktopSink::new()));
//! tokio::spawn(monitor.run());
//! handle.refresh_all().await;
//! ```

pub mod monitor;
pub mod notifications;
pub mod pace;
pub mod refresh;
pub mod staleness;
pub mod state;

pub use monitor::{MANUAL_STALE_CHECK_PERIOD, Monitor, MonitorEvent, MonitorHandle};
pub use notifications::{
    DesktopSink, LogSink, Notification, NotificationCategory, NotificationEngine,
    NotificationSink, RecordingSink,
};
pub use pace::{PaceProjection, PaceStage, project};
pub use refresh::{REFRESH_TIMEOUT, RefreshOrchestrator, RefreshOutcome, TIMEOUT_MESSAGE};
pub use staleness::{DEFAULT_STALE_AFTER_MS, Freshness, is_stale, stale_after_ms};
pub use state::{ProviderState, RefreshPhase};
