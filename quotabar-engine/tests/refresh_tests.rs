//! Integration tests for the refresh orchestrator.

use async_trait::async_trait;
use quotabar_core::{ProviderKind, UsageSnapshot, UsageWindow};
use quotabar_engine::{RefreshOrchestrator, RefreshOutcome, TIMEOUT_MESSAGE};
use quotabar_fetch::{FetchError, ProviderFetcher, ProviderRegistry};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Fake Fetchers
// ============================================================================

enum Behavior {
    Succeed(f64),
    Hang,
    Fail(&'static str),
    Partial(f64, &'static str),
}

struct FakeFetcher {
    kind: ProviderKind,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl FakeFetcher {
    fn new(kind: ProviderKind, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ProviderFetcher for FakeFetcher {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn fetch_usage(&self) -> Result<UsageSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Succeed(p) => Ok(UsageSnapshot::new().with_primary(UsageWindow::new(p))),
            Behavior::Hang => std::future::pending().await,
            Behavior::Fail(msg) => Err(FetchError::AuthenticationFailed(msg.to_string())),
            Behavior::Partial(p, msg) => Ok(UsageSnapshot::new()
                .with_primary(UsageWindow::new(p))
                .with_error(msg)),
        }
    }
}

/// Blocks until released, so tests can observe the loading state.
struct GatedFetcher {
    kind: ProviderKind,
    release: Arc<Notify>,
    calls: AtomicUsize,
}

#[async_trait]
impl ProviderFetcher for GatedFetcher {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn fetch_usage(&self) -> Result<UsageSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(UsageSnapshot::new().with_primary(UsageWindow::new(42.0)))
    }
}

fn orchestrator(fetchers: Vec<Arc<dyn ProviderFetcher>>) -> RefreshOrchestrator {
    let mut registry = ProviderRegistry::new();
    for f in fetchers {
        registry.register(f);
    }
    RefreshOrchestrator::new(Arc::new(registry)).with_timeout(Duration::from_millis(100))
}

async fn wait_until_loading(orchestrator: &RefreshOrchestrator, id: ProviderKind) {
    for _ in 0..200 {
        if orchestrator.state(id).await.is_some_and(|s| s.is_loading) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("{id:?} never started loading");
}

// ============================================================================
// Refresh All
// ============================================================================

#[tokio::test]
async fn test_refresh_all_mixed_outcomes() {
    let orchestrator = orchestrator(vec![
        FakeFetcher::new(ProviderKind::Claude, Behavior::Succeed(37.0)),
        FakeFetcher::new(ProviderKind::Codex, Behavior::Hang),
        FakeFetcher::new(ProviderKind::Cursor, Behavior::Fail("token expired")),
    ]);
    for id in [ProviderKind::Claude, ProviderKind::Codex, ProviderKind::Cursor] {
        orchestrator.set_provider_enabled(id, true).await;
    }

    let outcomes = orchestrator.refresh_all().await;

    assert_eq!(outcomes.len(), 3);
    assert!(!orchestrator.is_refreshing());
    assert!(orchestrator.last_global_refresh().await.is_some());

    let a = orchestrator.state(ProviderKind::Claude).await.unwrap();
    assert_eq!(a.usage.unwrap().primary.unwrap().used_percent, 37.0);
    assert_eq!(a.last_error, None);
    assert!(!a.is_loading);

    let b = orchestrator.state(ProviderKind::Codex).await.unwrap();
    assert_eq!(b.last_error.as_deref(), Some(TIMEOUT_MESSAGE));
    assert!(b.usage.is_none());
    assert!(!b.is_loading);

    let c = orchestrator.state(ProviderKind::Cursor).await.unwrap();
    assert!(c.last_error.unwrap().contains("token expired"));
    assert!(!c.is_loading);
}

#[tokio::test]
async fn test_refresh_all_skips_disabled() {
    let enabled = FakeFetcher::new(ProviderKind::Claude, Behavior::Succeed(10.0));
    let disabled = FakeFetcher::new(ProviderKind::Gemini, Behavior::Succeed(10.0));
    let orchestrator = orchestrator(vec![enabled.clone(), disabled.clone()]);
    orchestrator.set_provider_enabled(ProviderKind::Claude, true).await;

    let outcomes = orchestrator.refresh_all().await;

    assert_eq!(outcomes, vec![(ProviderKind::Claude, RefreshOutcome::Success { error: None })]);
    assert_eq!(enabled.calls.load(Ordering::SeqCst), 1);
    assert_eq!(disabled.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_refresh_all_with_nothing_enabled() {
    let orchestrator = orchestrator(vec![FakeFetcher::new(
        ProviderKind::Claude,
        Behavior::Succeed(10.0),
    )]);

    let outcomes = orchestrator.refresh_all().await;

    assert!(outcomes.is_empty());
    assert!(orchestrator.last_global_refresh().await.is_some());
    assert!(!orchestrator.is_refreshing());
}

// ============================================================================
// Refresh One
// ============================================================================

#[tokio::test]
async fn test_failure_after_success_keeps_usage() {
    let flaky = Arc::new(FlakyFetcher {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = orchestrator(vec![flaky]);

    let first = orchestrator.refresh_one(ProviderKind::Claude).await;
    assert_eq!(first, RefreshOutcome::Success { error: None });

    let second = orchestrator.refresh_one(ProviderKind::Claude).await;
    assert!(second.is_failed());

    let state = orchestrator.state(ProviderKind::Claude).await.unwrap();
    assert_eq!(state.usage.unwrap().primary.unwrap().used_percent, 12.0);
    assert!(state.last_error.unwrap().contains("rate limited"));
}

/// Succeeds once, then fails.
struct FlakyFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl ProviderFetcher for FlakyFetcher {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    async fn fetch_usage(&self) -> Result<UsageSnapshot, FetchError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(UsageSnapshot::new().with_primary(UsageWindow::new(12.0)))
        } else {
            Err(FetchError::InvalidResponse("rate limited".to_string()))
        }
    }
}

#[tokio::test]
async fn test_embedded_error_becomes_last_error() {
    let orchestrator = orchestrator(vec![FakeFetcher::new(
        ProviderKind::Factory,
        Behavior::Partial(70.0, "weekly window unavailable"),
    )]);

    let outcome = orchestrator.refresh_one(ProviderKind::Factory).await;

    assert_eq!(outcome.error(), Some("weekly window unavailable"));
    assert!(!outcome.is_failed());
    let state = orchestrator.state(ProviderKind::Factory).await.unwrap();
    assert!(state.usage.is_some());
    assert_eq!(state.last_error.as_deref(), Some("weekly window unavailable"));
}

#[tokio::test]
async fn test_refresh_disabled_provider_leaves_it_disabled() {
    let orchestrator = orchestrator(vec![FakeFetcher::new(
        ProviderKind::Kiro,
        Behavior::Succeed(5.0),
    )]);

    let outcome = orchestrator.refresh_one(ProviderKind::Kiro).await;

    assert!(outcome.applied());
    let state = orchestrator.state(ProviderKind::Kiro).await.unwrap();
    assert!(!state.enabled);
    assert!(state.usage.is_some());
}

#[tokio::test]
async fn test_unregistered_provider_is_unknown() {
    let orchestrator = orchestrator(vec![]);
    assert_eq!(
        orchestrator.refresh_one(ProviderKind::Copilot).await,
        RefreshOutcome::Unknown
    );
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_loading_is_visible_and_reentrant_refresh_coalesces() {
    let release = Arc::new(Notify::new());
    let fetcher = Arc::new(GatedFetcher {
        kind: ProviderKind::Claude,
        release: Arc::clone(&release),
        calls: AtomicUsize::new(0),
    });
    let orchestrator = Arc::new(
        RefreshOrchestrator::new(Arc::new(ProviderRegistry::new().with(fetcher.clone())))
            .with_timeout(Duration::from_secs(5)),
    );

    let first = tokio::spawn({
        let o = Arc::clone(&orchestrator);
        async move { o.refresh_one(ProviderKind::Claude).await }
    });
    wait_until_loading(&orchestrator, ProviderKind::Claude).await;

    let second = tokio::spawn({
        let o = Arc::clone(&orchestrator);
        async move { o.refresh_one(ProviderKind::Claude).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    release.notify_one();

    assert_eq!(first.await.unwrap(), RefreshOutcome::Success { error: None });
    assert_eq!(second.await.unwrap(), RefreshOutcome::Coalesced);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_shutdown_drops_late_results() {
    let release = Arc::new(Notify::new());
    let fetcher = Arc::new(GatedFetcher {
        kind: ProviderKind::Codex,
        release: Arc::clone(&release),
        calls: AtomicUsize::new(0),
    });
    let orchestrator = Arc::new(
        RefreshOrchestrator::new(Arc::new(ProviderRegistry::new().with(fetcher)))
            .with_timeout(Duration::from_secs(5)),
    );

    let pending = tokio::spawn({
        let o = Arc::clone(&orchestrator);
        async move { o.refresh_one(ProviderKind::Codex).await }
    });
    wait_until_loading(&orchestrator, ProviderKind::Codex).await;

    orchestrator.shutdown();
    release.notify_one();

    assert_eq!(pending.await.unwrap(), RefreshOutcome::Abandoned);
    let state = orchestrator.state(ProviderKind::Codex).await.unwrap();
    assert!(state.usage.is_none());
    assert!(state.last_attempt.is_none());

    assert_eq!(
        orchestrator.refresh_one(ProviderKind::Codex).await,
        RefreshOutcome::Abandoned
    );
}

#[tokio::test]
async fn test_dropped_pass_is_not_counted() {
    let release = Arc::new(Notify::new());
    let fetcher = Arc::new(GatedFetcher {
        kind: ProviderKind::Claude,
        release: Arc::clone(&release),
        calls: AtomicUsize::new(0),
    });
    let orchestrator =
        RefreshOrchestrator::new(Arc::new(ProviderRegistry::new().with(fetcher)))
            .with_timeout(Duration::from_secs(5));
    orchestrator.set_provider_enabled(ProviderKind::Claude, true).await;

    let cut_short =
        tokio::time::timeout(Duration::from_millis(50), orchestrator.refresh_all()).await;

    assert!(cut_short.is_err());
    assert!(!orchestrator.is_refreshing());
    assert!(orchestrator.last_global_refresh().await.is_none());
}

#[tokio::test]
async fn test_replaced_registry_serves_new_providers() {
    let orchestrator = orchestrator(vec![]);
    assert_eq!(
        orchestrator.refresh_one(ProviderKind::Gemini).await,
        RefreshOutcome::Unknown
    );

    orchestrator
        .set_registry(Arc::new(ProviderRegistry::new().with(FakeFetcher::new(
            ProviderKind::Gemini,
            Behavior::Succeed(64.0),
        ))))
        .await;

    assert_eq!(
        orchestrator.refresh_one(ProviderKind::Gemini).await,
        RefreshOutcome::Success { error: None }
    );
    assert_eq!(orchestrator.registry().await.kinds(), vec![ProviderKind::Gemini]);
}

#[tokio::test]
async fn test_subscribers_see_changes() {
    let orchestrator = orchestrator(vec![FakeFetcher::new(
        ProviderKind::Claude,
        Behavior::Succeed(1.0),
    )]);
    let mut rx = orchestrator.subscribe();

    orchestrator.refresh_one(ProviderKind::Claude).await;

    assert!(rx.has_changed().unwrap());
    let version = *rx.borrow_and_update();
    assert!(version >= 2);
}
