//! Provider fetcher trait and registry.
//!
//! The registry is the only way the refresh engine reaches a provider. Each
//! entry is an adapter that either produces a [`UsageSnapshot`] or fails
//! with a [`FetchError`]; how it gets there (HTTP, cookies, a CLI tool) is
//! the adapter's business.

use async_trait::async_trait;
use quotabar_core::{ProviderKind, UsageSnapshot};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::FetchError;

// ============================================================================
// Provider Fetcher
// ============================================================================

/// An adapter that fetches usage for one provider.
///
/// Implementations must bound their own I/O with a timeout shorter than the
/// orchestrator's refresh ceiling (30 seconds).
///
/// ## Implementing a Fetcher
///
/// ```ignore
/// struct StaticFetcher(UsageSnapshot);
///
/// #[async_trait]
/// impl ProviderFetcher for StaticFetcher {
///     fn kind(&self) -> ProviderKind {
///         ProviderKind::Claude
///     }
///
///     async fn fetch_usage(&self) -> Result<UsageSnapshot, FetchError> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait ProviderFetcher: Send + Sync {
    /// The provider this adapter serves.
    fn kind(&self) -> ProviderKind;

    /// Human-readable name, defaults to the provider's display name.
    fn display_name(&self) -> &str {
        self.kind().display_name()
    }

    /// Fetches the current usage snapshot.
    async fn fetch_usage(&self) -> Result<UsageSnapshot, FetchError>;
}

// ============================================================================
// Provider Registry
// ============================================================================

/// Maps provider ids to their adapters.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    fetchers: BTreeMap<ProviderKind, Arc<dyn ProviderFetcher>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter, replacing any previous one for the same provider.
    pub fn register(&mut self, fetcher: Arc<dyn ProviderFetcher>) {
        let kind = fetcher.kind();
        debug!(provider = ?kind, "Registering provider fetcher");
        self.fetchers.insert(kind, fetcher);
    }

    /// Builder-style [`ProviderRegistry::register`].
    #[must_use]
    pub fn with(mut self, fetcher: Arc<dyn ProviderFetcher>) -> Self {
        self.register(fetcher);
        self
    }

    /// Gets the adapter for a provider.
    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ProviderFetcher>> {
        self.fetchers.get(&kind).cloned()
    }

    /// Returns true if the provider has an adapter.
    pub fn contains(&self, kind: ProviderKind) -> bool {
        self.fetchers.contains_key(&kind)
    }

    /// Returns the registered provider ids, in stable order.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.fetchers.keys().copied().collect()
    }

    /// Returns the number of registered adapters.
    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }

    /// Fetches usage for a provider.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotConfigured`] if no adapter is registered,
    /// otherwise whatever the adapter returns.
    pub async fn fetch_usage(&self, kind: ProviderKind) -> Result<UsageSnapshot, FetchError> {
        let fetcher = self
            .get(kind)
            .ok_or_else(|| FetchError::NotConfigured(kind.cli_name().to_string()))?;
        fetcher.fetch_usage().await
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.kinds())
            .finish()
    }
}
