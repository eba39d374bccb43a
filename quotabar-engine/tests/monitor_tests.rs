//! Integration tests for the monitor event loop.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quotabar_core::{ProviderKind, UsageSnapshot, UsageWindow};
use quotabar_engine::{
    Monitor, MonitorEvent, NotificationCategory, RecordingSink, RefreshOrchestrator,
    RefreshOutcome,
};
use quotabar_fetch::{FetchError, ProviderFetcher, ProviderRegistry};
use quotabar_store::{RefreshCadence, Settings, SettingsStore};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

/// Reports a fixed percent, plus `step` more on every call.
struct Climbing {
    kind: ProviderKind,
    start: f64,
    step: f64,
    calls: AtomicU32,
}

#[async_trait]
impl ProviderFetcher for Climbing {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn fetch_usage(&self) -> Result<UsageSnapshot, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let percent = self.start + self.step * f64::from(n);
        Ok(UsageSnapshot::new().with_primary(UsageWindow::new(percent)))
    }
}

/// Always reports the same snapshot, stamped `updated_at`.
struct Frozen {
    kind: ProviderKind,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl ProviderFetcher for Frozen {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn fetch_usage(&self) -> Result<UsageSnapshot, FetchError> {
        Ok(UsageSnapshot::at(self.updated_at).with_primary(UsageWindow::new(20.0)))
    }
}

/// Never returns.
struct Stuck {
    kind: ProviderKind,
    calls: AtomicUsize,
}

#[async_trait]
impl ProviderFetcher for Stuck {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn fetch_usage(&self) -> Result<UsageSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

struct Setup {
    orchestrator: Arc<RefreshOrchestrator>,
    settings: Arc<SettingsStore>,
    sink: Arc<RecordingSink>,
}

fn setup(enabled: &[ProviderKind]) -> Setup {
    let registry = ProviderRegistry::new()
        .with(Arc::new(Climbing {
            kind: ProviderKind::Claude,
            start: 70.0,
            step: 15.0,
            calls: AtomicU32::new(0),
        }))
        .with(Arc::new(Climbing {
            kind: ProviderKind::Kiro,
            start: 10.0,
            step: 0.0,
            calls: AtomicU32::new(0),
        }));

    let settings = Settings {
        enabled_providers: enabled.iter().copied().collect(),
        refresh_cadence: RefreshCadence::Manual,
        ..Settings::default()
    };

    Setup {
        orchestrator: Arc::new(RefreshOrchestrator::new(Arc::new(registry))),
        settings: Arc::new(SettingsStore::with_settings(
            std::env::temp_dir().join("quotabar-monitor-test.json"),
            settings,
        )),
        sink: Arc::new(RecordingSink::new()),
    }
}

async fn next_event(rx: &mut broadcast::Receiver<MonitorEvent>) -> MonitorEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for monitor event")
        .expect("event channel closed")
}

#[tokio::test]
async fn test_initial_and_manual_refresh_raise_alerts() {
    let s = setup(&[ProviderKind::Claude]);
    let (monitor, handle) = Monitor::new(
        Arc::clone(&s.orchestrator),
        Arc::clone(&s.settings),
        s.sink.clone(),
    );
    let mut events = handle.subscribe();
    let task = tokio::spawn(monitor.run());

    // Startup refresh: 70%, nothing crossed.
    match next_event(&mut events).await {
        MonitorEvent::Refreshed {
            outcomes,
            notifications,
        } => {
            assert_eq!(
                outcomes,
                vec![(ProviderKind::Claude, RefreshOutcome::Success { error: None })]
            );
            assert!(notifications.is_empty());
        }
        other => panic!("unexpected event {other:?}"),
    }

    // Manual refresh: 85%, crosses 80.
    assert!(handle.refresh_all().await);
    match next_event(&mut events).await {
        MonitorEvent::Refreshed { notifications, .. } => {
            assert_eq!(notifications.len(), 1);
            assert_eq!(notifications[0].category, NotificationCategory::SessionQuota);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(s.sink.len(), 1);

    handle.shutdown();
    assert!(matches!(next_event(&mut events).await, MonitorEvent::Stopped));
    task.await.unwrap();
    assert!(s.orchestrator.is_closed());
}

#[tokio::test]
async fn test_single_provider_refresh_of_disabled_provider() {
    let s = setup(&[]);
    let (monitor, handle) = Monitor::new(
        Arc::clone(&s.orchestrator),
        Arc::clone(&s.settings),
        s.sink.clone(),
    );
    let monitor = monitor.without_initial_refresh();
    let mut events = handle.subscribe();
    let task = tokio::spawn(monitor.run());

    assert!(handle.refresh(ProviderKind::Kiro).await);
    match next_event(&mut events).await {
        MonitorEvent::Refreshed { outcomes, .. } => {
            assert_eq!(outcomes.len(), 1);
            assert_eq!(outcomes[0].0, ProviderKind::Kiro);
        }
        other => panic!("unexpected event {other:?}"),
    }
    let kiro = s.orchestrator.state(ProviderKind::Kiro).await.unwrap();
    assert!(!kiro.enabled);
    assert!(kiro.usage.is_some());

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test]
async fn test_settings_changes_are_applied() {
    let s = setup(&[ProviderKind::Claude]);
    let (monitor, handle) = Monitor::new(
        Arc::clone(&s.orchestrator),
        Arc::clone(&s.settings),
        s.sink.clone(),
    );
    let monitor = monitor.without_initial_refresh();
    let mut events = handle.subscribe();
    let task = tokio::spawn(monitor.run());

    // Let the loop subscribe to settings before changing them.
    tokio::time::sleep(Duration::from_millis(50)).await;
    s.settings.set_provider_enabled(ProviderKind::Kiro, true).await;

    match next_event(&mut events).await {
        MonitorEvent::SettingsApplied {
            refresh_interval_seconds,
        } => assert_eq!(refresh_interval_seconds, 0),
        other => panic!("unexpected event {other:?}"),
    }
    let enabled: BTreeSet<_> = s.orchestrator.enabled_providers().await.into_iter().collect();
    assert_eq!(enabled, BTreeSet::from([ProviderKind::Claude, ProviderKind::Kiro]));

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test]
async fn test_disabled_notifications_are_not_delivered() {
    let s = setup(&[ProviderKind::Claude]);
    s.settings
        .update(|settings| settings.notifications.enabled = false)
        .await;
    let (monitor, handle) = Monitor::new(
        Arc::clone(&s.orchestrator),
        Arc::clone(&s.settings),
        s.sink.clone(),
    );
    let mut events = handle.subscribe();
    let task = tokio::spawn(monitor.run());

    next_event(&mut events).await;
    handle.refresh_all().await;
    next_event(&mut events).await;
    handle.refresh_all().await;
    next_event(&mut events).await;

    assert!(s.sink.is_empty());

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test]
async fn test_dropping_every_handle_stops_the_loop() {
    let s = setup(&[]);
    let (monitor, handle) = Monitor::new(
        Arc::clone(&s.orchestrator),
        Arc::clone(&s.settings),
        s.sink.clone(),
    );
    let task = tokio::spawn(monitor.without_initial_refresh().run());

    drop(handle);

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("monitor kept running")
        .unwrap();
}

#[tokio::test]
async fn test_stale_check_runs_while_a_fetch_is_in_flight() {
    let stuck = Arc::new(Stuck {
        kind: ProviderKind::Codex,
        calls: AtomicUsize::new(0),
    });
    let registry = ProviderRegistry::new()
        .with(Arc::new(Frozen {
            kind: ProviderKind::Claude,
            updated_at: Utc::now() - chrono::Duration::hours(1),
        }))
        .with(stuck.clone());
    let orchestrator = Arc::new(RefreshOrchestrator::new(Arc::new(registry)));
    // Old data is already on screen before the monitor starts.
    orchestrator.refresh_one(ProviderKind::Claude).await;

    let settings = Arc::new(SettingsStore::with_settings(
        std::env::temp_dir().join("quotabar-monitor-stale-test.json"),
        Settings {
            enabled_providers: BTreeSet::from([ProviderKind::Claude, ProviderKind::Codex]),
            ..Settings::default()
        },
    ));
    let sink = Arc::new(RecordingSink::new());
    let (monitor, handle) = Monitor::new(Arc::clone(&orchestrator), settings, sink.clone());
    let mut events = handle.subscribe();
    let task = tokio::spawn(monitor.with_interval(1).run());

    // The startup pass never finishes because Codex is stuck.
    match next_event(&mut events).await {
        MonitorEvent::StaleDetected { notifications } => {
            assert_eq!(notifications.len(), 1);
            assert_eq!(notifications[0].provider, ProviderKind::Claude);
            assert_eq!(notifications[0].category, NotificationCategory::StaleUsage);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(orchestrator.is_refreshing());

    // Later ticks neither repeat the alert nor start another pass.
    let quiet = tokio::time::timeout(Duration::from_millis(2500), events.recv()).await;
    assert!(quiet.is_err(), "unexpected event {quiet:?}");
    assert_eq!(sink.len(), 1);
    assert_eq!(stuck.calls.load(Ordering::SeqCst), 1);

    handle.shutdown();
    assert!(matches!(next_event(&mut events).await, MonitorEvent::Stopped));
    task.await.unwrap();
    assert!(!orchestrator.is_refreshing());
}

#[tokio::test]
async fn test_provider_settings_change_rebuilds_adapters() {
    let s = setup(&[]);
    let (monitor, handle) = Monitor::new(
        Arc::clone(&s.orchestrator),
        Arc::clone(&s.settings),
        s.sink.clone(),
    );
    let monitor = monitor
        .without_initial_refresh()
        .with_registry_factory(|settings: &Settings| {
            let mut registry = ProviderRegistry::new();
            for &kind in settings.provider_settings.keys() {
                registry.register(Arc::new(Climbing {
                    kind,
                    start: 5.0,
                    step: 0.0,
                    calls: AtomicU32::new(0),
                }));
            }
            registry
        });
    let mut events = handle.subscribe();
    let task = tokio::spawn(monitor.run());

    tokio::time::sleep(Duration::from_millis(50)).await;
    s.settings
        .set_provider_command(ProviderKind::Gemini, Some("gemini-usage".to_string()), Vec::new())
        .await;
    assert!(matches!(
        next_event(&mut events).await,
        MonitorEvent::SettingsApplied { .. }
    ));

    assert!(handle.refresh(ProviderKind::Gemini).await);
    match next_event(&mut events).await {
        MonitorEvent::Refreshed { outcomes, .. } => assert_eq!(
            outcomes,
            vec![(ProviderKind::Gemini, RefreshOutcome::Success { error: None })]
        ),
        other => panic!("unexpected event {other:?}"),
    }

    handle.shutdown();
    task.await.unwrap();
}
