//! Refresh orchestration.
//!
//! Drives per-provider fetches through the [`ProviderRegistry`], bounds each
//! one with a hard timeout, and owns every [`ProviderState`]. Front ends
//! read state through snapshots and learn about changes via [`subscribe`].
//!
//! [`subscribe`]: RefreshOrchestrator::subscribe

use chrono::{DateTime, Utc};
use futures::future::join_all;
use quotabar_core::{Incident, ProviderKind};
use quotabar_fetch::ProviderRegistry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, info, warn};

use crate::state::ProviderState;

/// Hard ceiling on a single provider fetch.
///
/// Must stay above every adapter's own timeout.
pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Error recorded when a fetch hits [`REFRESH_TIMEOUT`].
pub const TIMEOUT_MESSAGE: &str = "Refresh timed out";

// ============================================================================
// Refresh Outcome
// ============================================================================

/// What a call to [`RefreshOrchestrator::refresh_one`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The adapter returned a snapshot, possibly carrying its own error.
    Success {
        /// Error embedded in the snapshot.
        error: Option<String>,
    },
    /// The adapter failed or timed out; previous usage was kept.
    Failed(String),
    /// Another refresh of the same provider was in flight; waited for it.
    Coalesced,
    /// No adapter is registered for the provider.
    Unknown,
    /// The orchestrator shut down before the result could be applied.
    Abandoned,
}

impl RefreshOutcome {
    /// Returns true if this call wrote a result into provider state.
    pub fn applied(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Failed(_))
    }

    /// Returns true if the fetch itself failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Error string the attempt left behind, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { error } => error.as_deref(),
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

// ============================================================================
// Inner State
// ============================================================================

struct Inner {
    states: BTreeMap<ProviderKind, ProviderState>,
    last_global_refresh: Option<DateTime<Utc>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            states: ProviderKind::all()
                .iter()
                .map(|&kind| (kind, ProviderState::new(kind)))
                .collect(),
            last_global_refresh: None,
        }
    }

    fn state_mut(&mut self, id: ProviderKind) -> &mut ProviderState {
        self.states.entry(id).or_insert_with(|| ProviderState::new(id))
    }
}

/// Counts one `refresh_all` pass for as long as it lives, including when
/// the pass future is dropped before it finishes.
struct PassGuard<'a>(&'a AtomicU32);

impl<'a> PassGuard<'a> {
    fn enter(passes: &'a AtomicU32) -> Self {
        passes.fetch_add(1, Ordering::SeqCst);
        Self(passes)
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Refresh Orchestrator
// ============================================================================

/// Runs refreshes and owns provider state.
///
/// At most one fetch per provider is in flight at any time; a second
/// request for the same provider waits for the first and reports
/// [`RefreshOutcome::Coalesced`].
pub struct RefreshOrchestrator {
    registry: RwLock<Arc<ProviderRegistry>>,
    inner: Arc<RwLock<Inner>>,
    gates: BTreeMap<ProviderKind, Arc<Mutex<()>>>,
    timeout: Duration,
    passes: AtomicU32,
    closed: AtomicBool,
    notify: watch::Sender<u64>,
}

impl RefreshOrchestrator {
    /// Creates an orchestrator with every provider disabled.
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            registry: RwLock::new(registry),
            inner: Arc::new(RwLock::new(Inner::new())),
            gates: ProviderKind::all()
                .iter()
                .map(|&kind| (kind, Arc::new(Mutex::new(()))))
                .collect(),
            timeout: REFRESH_TIMEOUT,
            passes: AtomicU32::new(0),
            closed: AtomicBool::new(false),
            notify,
        }
    }

    /// Overrides the per-fetch timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-fetch timeout in effect.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The registry fetches go through.
    pub async fn registry(&self) -> Arc<ProviderRegistry> {
        Arc::clone(&*self.registry.read().await)
    }

    /// Swaps in a new set of adapters.
    ///
    /// Fetches already in flight finish against the adapter they started
    /// with.
    pub async fn set_registry(&self, registry: Arc<ProviderRegistry>) {
        info!(adapters = registry.len(), "Provider adapters replaced");
        *self.registry.write().await = registry;
    }

    /// Subscribes to state changes (version counter).
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    fn bump(&self) {
        self.notify.send_modify(|v| *v = v.wrapping_add(1));
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Refreshes one provider.
    ///
    /// Disabled providers may be refreshed; `enabled` is left alone. The
    /// fetch is never retried here.
    pub async fn refresh_one(&self, id: ProviderKind) -> RefreshOutcome {
        let Some(fetcher) = self.registry.read().await.get(id) else {
            debug!(provider = ?id, "No adapter registered, skipping refresh");
            return RefreshOutcome::Unknown;
        };
        if self.is_closed() {
            return RefreshOutcome::Abandoned;
        }
        let Some(gate) = self.gates.get(&id) else {
            return RefreshOutcome::Unknown;
        };

        let Ok(_guard) = gate.try_lock() else {
            debug!(provider = ?id, "Refresh already in flight, coalescing");
            drop(gate.lock().await);
            return RefreshOutcome::Coalesced;
        };

        {
            let mut inner = self.inner.write().await;
            inner.state_mut(id).is_loading = true;
        }
        self.bump();

        debug!(provider = ?id, timeout_ms = self.timeout.as_millis(), "Fetching usage");
        let result = match tokio::time::timeout(self.timeout, fetcher.fetch_usage()).await {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(TIMEOUT_MESSAGE.to_string()),
        };

        let outcome = {
            let mut inner = self.inner.write().await;
            // Re-checked under the lock: nothing is applied after shutdown.
            if self.is_closed() {
                debug!(provider = ?id, "Dropping result that arrived after shutdown");
                return RefreshOutcome::Abandoned;
            }
            let state = inner.state_mut(id);
            state.is_loading = false;
            state.last_attempt = Some(Utc::now());

            match result {
                Ok(snapshot) => {
                    let error = snapshot.error.clone();
                    if let Some(ref e) = error {
                        warn!(provider = ?id, error = %e, "Snapshot carries an error");
                    } else {
                        debug!(provider = ?id, "Refresh succeeded");
                    }
                    state.usage = Some(snapshot);
                    state.last_error.clone_from(&error);
                    RefreshOutcome::Success { error }
                }
                Err(message) => {
                    warn!(provider = ?id, error = %message, "Refresh failed");
                    state.last_error = Some(message.clone());
                    RefreshOutcome::Failed(message)
                }
            }
        };
        self.bump();
        outcome
    }

    /// Refreshes every enabled provider concurrently.
    ///
    /// Waits for all of them; one provider failing never cancels another.
    /// Stamps [`last_global_refresh`](Self::last_global_refresh) even when
    /// nothing is enabled.
    pub async fn refresh_all(&self) -> Vec<(ProviderKind, RefreshOutcome)> {
        let pass = PassGuard::enter(&self.passes);
        let enabled = self.enabled_providers().await;
        self.bump();
        info!(count = enabled.len(), "Refreshing all enabled providers");

        let outcomes = join_all(
            enabled
                .into_iter()
                .map(|id| async move { (id, self.refresh_one(id).await) }),
        )
        .await;

        self.inner.write().await.last_global_refresh = Some(Utc::now());
        drop(pass);
        self.bump();

        let failed = outcomes.iter().filter(|(_, o)| o.is_failed()).count();
        info!(total = outcomes.len(), failed, "Refresh pass complete");
        outcomes
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Enables or disables a provider for refresh-all passes.
    pub async fn set_provider_enabled(&self, id: ProviderKind, enabled: bool) {
        let changed = {
            let mut inner = self.inner.write().await;
            let state = inner.state_mut(id);
            let changed = state.enabled != enabled;
            state.enabled = enabled;
            changed
        };
        if changed {
            debug!(provider = ?id, enabled, "Provider toggled");
            self.bump();
        }
    }

    /// Makes exactly `enabled` the enabled set.
    pub async fn sync_enabled(&self, enabled: &BTreeSet<ProviderKind>) {
        let changed = {
            let mut inner = self.inner.write().await;
            let mut changed = false;
            for &kind in ProviderKind::all() {
                let state = inner.state_mut(kind);
                let want = enabled.contains(&kind);
                changed |= state.enabled != want;
                state.enabled = want;
            }
            changed
        };
        if changed {
            self.bump();
        }
    }

    /// Records a service incident (or clears it with `None`).
    pub async fn set_status(&self, id: ProviderKind, status: Option<Incident>) {
        self.inner.write().await.state_mut(id).status = status;
        self.bump();
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Current state of one provider.
    pub async fn state(&self, id: ProviderKind) -> Option<ProviderState> {
        self.inner.read().await.states.get(&id).cloned()
    }

    /// Current state of every provider, in stable order.
    pub async fn states(&self) -> Vec<ProviderState> {
        self.inner.read().await.states.values().cloned().collect()
    }

    /// Ids of enabled providers.
    pub async fn enabled_providers(&self) -> Vec<ProviderKind> {
        self.inner
            .read()
            .await
            .states
            .values()
            .filter(|s| s.enabled)
            .map(|s| s.id)
            .collect()
    }

    /// Returns true while a refresh-all pass is running.
    pub fn is_refreshing(&self) -> bool {
        self.passes.load(Ordering::SeqCst) > 0
    }

    /// When the last refresh-all pass finished.
    pub async fn last_global_refresh(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_global_refresh
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Stops applying results. Fetches still in flight are abandoned.
    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Refresh orchestrator shut down");
        }
    }

    /// Returns true after [`shutdown`](Self::shutdown).
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for RefreshOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshOrchestrator")
            .field("registry", &self.registry)
            .field("timeout", &self.timeout)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
