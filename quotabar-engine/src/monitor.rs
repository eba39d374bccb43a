//! Long-running monitor service.
//!
//! A single event loop that drives the refresh timer, the stale-check
//! timer, settings changes, manual refresh requests and shutdown. It owns
//! the [`NotificationEngine`] and forwards every alert to a
//! [`NotificationSink`].
//!
//! Refresh passes run as spawned tasks and report back into the loop, so
//! the stale check keeps its own cadence while fetches are in flight.

use chrono::Utc;
use quotabar_core::ProviderKind;
use quotabar_fetch::ProviderRegistry;
use quotabar_store::{Settings, SettingsStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::notifications::{Notification, NotificationEngine, NotificationSink};
use crate::refresh::{RefreshOrchestrator, RefreshOutcome};

/// Stale-check cadence when auto-refresh is off.
pub const MANUAL_STALE_CHECK_PERIOD: Duration = Duration::from_secs(60);

const COMMAND_BUFFER: usize = 16;
const EVENT_BUFFER: usize = 64;

// ============================================================================
// Events & Commands
// ============================================================================

/// What the monitor just did, for front ends.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A refresh finished.
    Refreshed {
        /// Per-provider outcome.
        outcomes: Vec<(ProviderKind, RefreshOutcome)>,
        /// Alerts raised by it.
        notifications: Vec<Notification>,
    },
    /// A stale check raised alerts.
    StaleDetected {
        /// Alerts raised.
        notifications: Vec<Notification>,
    },
    /// Settings were reloaded.
    SettingsApplied {
        /// Refresh interval now in effect, 0 for manual.
        refresh_interval_seconds: i64,
    },
    /// The loop exited.
    Stopped,
}

type Outcomes = Vec<(ProviderKind, RefreshOutcome)>;

type RegistryFactory = Box<dyn Fn(&Settings) -> ProviderRegistry + Send + Sync>;

#[derive(Debug, Clone, Copy)]
enum Command {
    RefreshAll,
    Refresh(ProviderKind),
}

/// Controls a running [`Monitor`].
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<Command>,
    shutdown: Arc<watch::Sender<bool>>,
    events: broadcast::Sender<MonitorEvent>,
}

impl MonitorHandle {
    /// Requests a refresh of every enabled provider.
    ///
    /// Returns false if the monitor is gone.
    pub async fn refresh_all(&self) -> bool {
        self.commands.send(Command::RefreshAll).await.is_ok()
    }

    /// Requests a refresh of one provider, enabled or not.
    pub async fn refresh(&self, provider: ProviderKind) -> bool {
        self.commands.send(Command::Refresh(provider)).await.is_ok()
    }

    /// Stops the monitor. In-flight fetches are abandoned.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Subscribes to monitor events.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }
}

// ============================================================================
// Monitor
// ============================================================================

/// Owns the event loop. Consumed by [`Monitor::run`].
pub struct Monitor {
    orchestrator: Arc<RefreshOrchestrator>,
    settings: Arc<SettingsStore>,
    engine: NotificationEngine,
    sink: Arc<dyn NotificationSink>,
    interval_override: Option<i64>,
    initial_refresh: bool,
    registry_factory: Option<RegistryFactory>,
    commands: mpsc::Receiver<Command>,
    shutdown: watch::Receiver<bool>,
    events: broadcast::Sender<MonitorEvent>,
}

impl Monitor {
    /// Creates a monitor and the handle that controls it.
    pub fn new(
        orchestrator: Arc<RefreshOrchestrator>,
        settings: Arc<SettingsStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> (Self, MonitorHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let handle = MonitorHandle {
            commands: command_tx,
            shutdown: Arc::new(shutdown_tx),
            events: events.clone(),
        };
        let monitor = Self {
            orchestrator,
            settings,
            engine: NotificationEngine::new(),
            sink,
            interval_override: None,
            initial_refresh: true,
            registry_factory: None,
            commands: command_rx,
            shutdown: shutdown_rx,
            events,
        };
        (monitor, handle)
    }

    /// Uses a fixed refresh interval instead of the configured cadence.
    #[must_use]
    pub fn with_interval(mut self, seconds: i64) -> Self {
        self.interval_override = Some(seconds);
        self
    }

    /// Skips the refresh normally run on startup.
    #[must_use]
    pub fn without_initial_refresh(mut self) -> Self {
        self.initial_refresh = false;
        self
    }

    /// Rebuilds the provider adapters whenever provider settings change.
    #[must_use]
    pub fn with_registry_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Settings) -> ProviderRegistry + Send + Sync + 'static,
    {
        self.registry_factory = Some(Box::new(factory));
        self
    }

    fn interval_seconds(&self, settings: &Settings) -> i64 {
        self.interval_override
            .unwrap_or_else(|| settings.refresh_interval_seconds())
    }

    fn emit(&self, event: MonitorEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Runs until [`MonitorHandle::shutdown`] or until every handle is dropped.
    pub async fn run(mut self) {
        let mut current = self.settings.get().await;
        self.orchestrator
            .sync_enabled(&current.enabled_providers)
            .await;

        let mut interval_secs = self.interval_seconds(&current);
        let (mut refresh_timer, mut stale_timer) = timers(interval_secs);
        let mut settings_rx = self.settings.subscribe();
        let mut settings_open = true;
        let mut passes: JoinSet<Outcomes> = JoinSet::new();
        info!(interval_secs, "Monitor started");

        if self.initial_refresh {
            self.spawn_refresh(&mut passes, None);
        }

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => break,
                () = next_tick(&mut refresh_timer) => {
                    if passes.is_empty() {
                        debug!("Refresh tick");
                        self.spawn_refresh(&mut passes, None);
                    } else {
                        debug!(in_flight = passes.len(), "Refresh still running, skipping tick");
                    }
                }
                _ = stale_timer.tick() => self.check_stale(&current, interval_secs).await,
                Some(joined) = passes.join_next(), if !passes.is_empty() => match joined {
                    Ok(outcomes) => self.on_refreshed(outcomes, &current).await,
                    Err(e) => warn!(error = %e, "Refresh task did not finish"),
                },
                changed = settings_rx.changed(), if settings_open => {
                    if changed.is_err() {
                        settings_open = false;
                        continue;
                    }
                    let next = self.settings.get().await;
                    if next.provider_settings != current.provider_settings {
                        if let Some(factory) = &self.registry_factory {
                            self.orchestrator.set_registry(Arc::new(factory(&next))).await;
                        }
                    }
                    current = next;
                    self.orchestrator.sync_enabled(&current.enabled_providers).await;

                    let next_secs = self.interval_seconds(&current);
                    if next_secs != interval_secs {
                        info!(from = interval_secs, to = next_secs, "Refresh interval changed");
                        interval_secs = next_secs;
                        (refresh_timer, stale_timer) = timers(interval_secs);
                    }
                    self.emit(MonitorEvent::SettingsApplied {
                        refresh_interval_seconds: interval_secs,
                    });
                }
                command = self.commands.recv() => match command {
                    Some(Command::RefreshAll) => self.spawn_refresh(&mut passes, None),
                    Some(Command::Refresh(id)) => self.spawn_refresh(&mut passes, Some(id)),
                    None => break,
                },
            }
        }

        self.orchestrator.shutdown();
        if !passes.is_empty() {
            debug!(in_flight = passes.len(), "Abandoning refreshes in flight");
        }
        passes.shutdown().await;
        self.emit(MonitorEvent::Stopped);
        info!("Monitor stopped");
    }

    /// Starts a refresh of one provider, or of every enabled provider.
    ///
    /// Overlapping passes are safe: the orchestrator coalesces per provider.
    fn spawn_refresh(&self, passes: &mut JoinSet<Outcomes>, target: Option<ProviderKind>) {
        let orchestrator = Arc::clone(&self.orchestrator);
        passes.spawn(async move {
            match target {
                None => orchestrator.refresh_all().await,
                Some(id) => vec![(id, orchestrator.refresh_one(id).await)],
            }
        });
    }

    /// Runs the alert rules over a finished refresh.
    async fn on_refreshed(&mut self, outcomes: Outcomes, settings: &Settings) {
        let mut notifications = Vec::new();
        for (id, outcome) in &outcomes {
            let Some(state) = self.orchestrator.state(*id).await else {
                continue;
            };
            notifications.extend(self.engine.on_refresh(&state, outcome, &settings.notifications));
        }
        self.deliver(&notifications).await;

        self.emit(MonitorEvent::Refreshed {
            outcomes,
            notifications,
        });
    }

    async fn check_stale(&mut self, settings: &Settings, interval_secs: i64) {
        let states = self.orchestrator.states().await;
        let notifications =
            self.engine
                .on_stale_tick(&states, interval_secs, &settings.notifications, Utc::now());
        if notifications.is_empty() {
            return;
        }
        self.deliver(&notifications).await;
        self.emit(MonitorEvent::StaleDetected { notifications });
    }

    async fn deliver(&self, notifications: &[Notification]) {
        for n in notifications {
            debug!(provider = ?n.provider, category = ?n.category, "Delivering notification");
            self.sink.notify(&n.title, &n.body).await;
        }
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("orchestrator", &self.orchestrator)
            .field("interval_override", &self.interval_override)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Timers
// ============================================================================

/// Builds the refresh and stale-check timers for an interval.
///
/// Manual mode (`<= 0`) has no refresh timer and checks staleness every
/// [`MANUAL_STALE_CHECK_PERIOD`].
fn timers(interval_secs: i64) -> (Option<Interval>, Interval) {
    let period = u64::try_from(interval_secs)
        .ok()
        .filter(|&s| s > 0)
        .map(Duration::from_secs);

    let make = |period: Duration| {
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer
    };

    match period {
        Some(period) => (Some(make(period)), make(period)),
        None => {
            info!("Auto-refresh disabled, only manual refreshes will run");
            (None, make(MANUAL_STALE_CHECK_PERIOD))
        }
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
