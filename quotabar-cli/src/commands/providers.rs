//! Providers command - list providers and how they are wired.

use anyhow::Result;
use quotabar_core::ProviderKind;
use quotabar_fetch::ProcessRunner;
use quotabar_store::SettingsStore;
use std::sync::Arc;
use tracing::debug;

use crate::output::{JsonFormatter, TextFormatter, provider_info};
use crate::{Cli, OutputFormat};

/// Runs the providers command.
pub async fn run(cli: &Cli, settings: &Arc<SettingsStore>) -> Result<()> {
    let current = settings.get().await;
    let runner = ProcessRunner::new();

    let rows: Vec<(ProviderKind, bool, Option<String>, bool)> = ProviderKind::all()
        .iter()
        .map(|&kind| {
            let command = current
                .provider_settings
                .get(&kind)
                .and_then(|p| p.command.clone())
                .filter(|c| !c.trim().is_empty());
            let available = command.as_deref().is_some_and(|c| runner.command_exists(c));
            (kind, current.is_provider_enabled(kind), command, available)
        })
        .collect();

    debug!(
        configured = rows.iter().filter(|r| r.2.is_some()).count(),
        "Listing providers"
    );

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);

            println!("{}", formatter.format_providers_header());
            println!("{}", "─".repeat(60));

            for (kind, enabled, command, available) in &rows {
                println!(
                    "{}",
                    formatter.format_provider_line(*kind, *enabled, command.as_deref(), *available)
                );
            }

            println!();
            println!(
                "Total: {} providers ({} enabled)",
                rows.len(),
                rows.iter().filter(|r| r.1).count()
            );
        }
        OutputFormat::Json => {
            let infos: Vec<_> = rows
                .into_iter()
                .map(|(kind, enabled, command, available)| {
                    provider_info(kind, enabled, command, available)
                })
                .collect();
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_providers(&infos)?);
        }
    }

    Ok(())
}
