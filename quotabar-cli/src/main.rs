// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! QuotaBar CLI - watch LLM provider quotas from the terminal.
//!
//! # Examples
//!
//! ```bash
//! # Refresh every enabled provider once
//! quotabar refresh
//!
//! # Refresh one provider, JSON output
//! quotabar --format json refresh --provider claude
//!
//! # Keep running, with desktop notifications
//! quotabar watch
//!
//! # Wire a provider to a command that prints a usage snapshot
//! quotabar config command claude claude-usage --json
//! quotabar config enable claude
//! ```

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use quotabar_store::LogLevel;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{config, providers, refresh, watch};

// ============================================================================
// CLI Definition
// ============================================================================

/// QuotaBar CLI - LLM provider quota monitoring.
#[derive(Parser)]
#[command(name = "quotabar")]
#[command(about = "Watch LLM provider quotas and get alerted before they run out")]
#[command(long_about = r#"
QuotaBar polls your LLM provider accounts, flags stale data, and raises a
notification when a session quota crosses 80% / 90% or credits fall to
20% / 10%.

Each provider is backed by a command that prints a JSON usage snapshot:
  quotabar config command <provider> <program> [args...]

Examples:
  quotabar refresh                  # One refresh of enabled providers
  quotabar refresh -p codex         # One provider, enabled or not
  quotabar watch                    # Keep running until Ctrl+C
  quotabar config interval 5m       # Refresh every five minutes
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Settings file (defaults to the platform config dir).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (no logging).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the monitor until interrupted.
    #[command(visible_alias = "w")]
    Watch(watch::WatchArgs),

    /// Refresh once and print the result.
    #[command(visible_alias = "r")]
    Refresh(refresh::RefreshArgs),

    /// List providers and how they are configured.
    #[command(visible_alias = "p")]
    Providers,

    /// Inspect or edit settings.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// General error.
    Error = 1,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn log_filter(verbose: bool, level: LogLevel) -> String {
    if verbose {
        "quotabar=debug,info".to_string()
    } else {
        format!("quotabar={level}")
    }
}

fn setup_logging(verbose: bool, quiet: bool, level: LogLevel) {
    if quiet {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(verbose, level)));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match context::load_settings(&cli).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(ExitCode::Error as i32);
        }
    };
    setup_logging(cli.verbose, cli.quiet, settings.get().await.log_level);

    let result = match &cli.command {
        Commands::Watch(args) => watch::run(args, &cli, settings).await,
        Commands::Refresh(args) => refresh::run(args, &cli, &settings).await,
        Commands::Providers => providers::run(&cli, &settings).await,
        Commands::Config(args) => config::run(args, &cli, &settings).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(ExitCode::Error as i32);
    }

    Ok(())
}
