//! Refresh command - fetch once and print the result.

use anyhow::{Result, bail};
use chrono::Utc;
use clap::Args;
use quotabar_engine::{ProviderState, RefreshOutcome};
use quotabar_store::SettingsStore;
use std::sync::Arc;
use tracing::info;

use crate::context::{build_orchestrator, provider_arg};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the refresh command.
#[derive(Args)]
pub struct RefreshArgs {
    /// Refresh only this provider, even if it is disabled.
    #[arg(long, short)]
    pub provider: Option<String>,
}

/// Runs the refresh command.
pub async fn run(args: &RefreshArgs, cli: &Cli, settings: &Arc<SettingsStore>) -> Result<()> {
    let orchestrator = build_orchestrator(settings).await;
    let interval = settings.refresh_interval_seconds().await;

    let (outcomes, states) = match &args.provider {
        Some(name) => {
            let id = provider_arg(name)?;
            let outcome = orchestrator.refresh_one(id).await;
            if outcome == RefreshOutcome::Unknown {
                bail!(
                    "No command configured for {}. Set one with: quotabar config command {} <program> [args...]",
                    id.display_name(),
                    id.cli_name()
                );
            }
            let states: Vec<ProviderState> = orchestrator.state(id).await.into_iter().collect();
            (vec![(id, outcome)], states)
        }
        None => {
            let outcomes = orchestrator.refresh_all().await;
            let states = orchestrator
                .states()
                .await
                .into_iter()
                .filter(|s| s.enabled)
                .collect();
            (outcomes, states)
        }
    };

    let failed = outcomes.iter().filter(|(_, o)| o.is_failed()).count();
    info!(refreshed = outcomes.len(), failed, "Refresh finished");

    let now = Utc::now();
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            if states.is_empty() {
                println!(
                    "{}",
                    formatter.dim("No providers enabled. Try: quotabar config enable <provider>")
                );
            } else {
                let blocks: Vec<String> = states
                    .iter()
                    .map(|state| formatter.format_state(state, interval, now))
                    .collect();
                println!("{}", blocks.join("\n\n"));
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_states(&states, interval, now)?);
        }
    }

    if !outcomes.is_empty() && failed == outcomes.len() {
        bail!("Every refresh failed");
    }
    Ok(())
}
