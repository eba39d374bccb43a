//! Wiring shared by the commands: settings, registry and orchestrator.

use anyhow::{Context, Result};
use quotabar_core::{ProviderKind, parse_provider};
use quotabar_engine::RefreshOrchestrator;
use quotabar_fetch::{CommandFetcher, ProviderRegistry};
use quotabar_store::{Settings, SettingsStore, default_settings_path};
use std::sync::Arc;
use tracing::debug;

use crate::Cli;

/// Loads settings from `--config` or the default location.
pub async fn load_settings(cli: &Cli) -> Result<Arc<SettingsStore>> {
    let path = cli.config.clone().unwrap_or_else(default_settings_path);
    let store = SettingsStore::load(path.clone())
        .await
        .with_context(|| format!("loading settings from {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Builds a registry with one command adapter per configured provider.
pub fn build_registry(settings: &Settings) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    for (kind, provider) in &settings.provider_settings {
        let Some(program) = provider.command.as_deref().filter(|c| !c.trim().is_empty()) else {
            continue;
        };

        let mut fetcher = CommandFetcher::new(*kind, program).with_args(provider.args.clone());
        if let Some(timeout) = provider.timeout() {
            fetcher = fetcher.with_timeout(timeout);
        }
        debug!(provider = ?kind, program, "Configured command adapter");
        registry.register(Arc::new(fetcher));
    }

    registry
}

/// Builds an orchestrator over the configured adapters, with the
/// enabled set taken from settings.
pub async fn build_orchestrator(settings: &SettingsStore) -> Arc<RefreshOrchestrator> {
    let current = settings.get().await;
    let orchestrator = RefreshOrchestrator::new(Arc::new(build_registry(&current)));
    orchestrator.sync_enabled(&current.enabled_providers).await;
    Arc::new(orchestrator)
}

/// Parses a provider name, with a hint on failure.
pub fn provider_arg(name: &str) -> Result<ProviderKind> {
    parse_provider(name).with_context(|| {
        let names: Vec<_> = ProviderKind::all().iter().map(ProviderKind::cli_name).collect();
        format!("expected one of: {}", names.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotabar_store::ProviderSettings;

    #[test]
    fn test_registry_from_settings() {
        let mut settings = Settings::default();
        settings.provider_settings.insert(
            ProviderKind::Claude,
            ProviderSettings {
                command: Some("claude-usage".to_string()),
                args: vec!["--json".to_string()],
                timeout_secs: Some(10),
            },
        );
        settings.provider_settings.insert(
            ProviderKind::Codex,
            ProviderSettings {
                command: Some("  ".to_string()),
                ..ProviderSettings::default()
            },
        );
        settings
            .provider_settings
            .insert(ProviderKind::Cursor, ProviderSettings::default());

        let registry = build_registry(&settings);

        assert_eq!(registry.kinds(), vec![ProviderKind::Claude]);
    }

    #[test]
    fn test_provider_arg() {
        assert_eq!(provider_arg("Claude").unwrap(), ProviderKind::Claude);

        let err = provider_arg("nope").unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("expected one of"));
        assert!(chain.contains("Unknown provider: nope"));
    }
}
