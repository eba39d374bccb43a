//! Config command - inspect and edit settings.

use anyhow::{Result, bail};
use clap::{Args, Subcommand, ValueEnum};
use quotabar_store::{
    LogLevel, NotificationSettings, RefreshCadence, Settings, SettingsStore, default_config_dir,
};
use std::sync::Arc;
use tracing::info;

use crate::context::provider_arg;
use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Enable a provider.
    Enable {
        /// Provider to enable.
        provider: String,
    },

    /// Disable a provider.
    Disable {
        /// Provider to disable.
        provider: String,
    },

    /// Set the refresh cadence.
    Interval {
        /// manual, 1m, 2m, 5m, 15m, 30m, or a number of seconds.
        cadence: String,
    },

    /// Turn alerts on or off.
    Notify {
        /// Which alerts.
        target: NotifyTarget,
        /// New state.
        state: Toggle,
    },

    /// Set the command that prints a provider's usage snapshot.
    ///
    /// Omit the program to clear it.
    Command {
        /// Provider to configure.
        provider: String,
        /// Program to run.
        program: Option<String>,
        /// Arguments passed to the program.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Set the log level.
    LogLevel {
        /// error, warn, info, debug or trace.
        level: String,
    },

    /// Reset to defaults.
    Reset,
}

/// Alert group for `config notify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NotifyTarget {
    /// Master switch.
    All,
    /// Session quota thresholds.
    Session,
    /// Low credits.
    Credits,
    /// Refresh failures.
    Failure,
    /// Stale data.
    Stale,
}

/// On/off switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    /// Enable.
    On,
    /// Disable.
    Off,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli, settings: &Arc<SettingsStore>) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli, settings).await,
        ConfigAction::Path => show_paths(cli, settings),
        ConfigAction::Enable { provider } => set_enabled(settings, provider, true).await,
        ConfigAction::Disable { provider } => set_enabled(settings, provider, false).await,
        ConfigAction::Interval { cadence } => {
            let cadence = parse_cadence(cadence)?;
            settings.set_refresh_cadence(cadence).await;
            settings.save().await?;
            info!(cadence = %cadence, "Refresh cadence updated");
            println!("Refresh cadence set to: {cadence}");
            Ok(())
        }
        ConfigAction::Notify { target, state } => {
            let mut notifications = settings.notifications().await;
            apply_toggle(&mut notifications, *target, *state == Toggle::On);
            settings.set_notifications(notifications).await;
            settings.save().await?;
            println!(
                "Notifications ({}): {}",
                format!("{target:?}").to_lowercase(),
                if *state == Toggle::On { "on" } else { "off" }
            );
            Ok(())
        }
        ConfigAction::Command {
            provider,
            program,
            args,
        } => set_command(settings, provider, program.as_deref(), args).await,
        ConfigAction::LogLevel { level } => {
            let level = parse_log_level(level)?;
            settings.update(|s| s.log_level = level).await;
            settings.save().await?;
            println!("Log level set to: {level}");
            Ok(())
        }
        ConfigAction::Reset => {
            settings.update(|s| *s = Settings::default()).await;
            settings.save().await?;
            info!(path = %settings.path().display(), "Settings reset");
            println!("Configuration reset to defaults");
            Ok(())
        }
    }
}

async fn show_config(cli: &Cli, store: &SettingsStore) -> Result<()> {
    let settings = store.get().await;

    match cli.format {
        OutputFormat::Text => {
            let on_off = |b: bool| if b { "on" } else { "off" };
            let n = settings.notifications;

            println!("QuotaBar Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("Enabled providers:");
            if settings.enabled_providers.is_empty() {
                println!("  (none)");
            }
            for provider in &settings.enabled_providers {
                println!("  • {}", provider.display_name());
            }
            println!();
            println!("Refresh cadence: {}", settings.refresh_cadence);
            println!("Log level:       {}", settings.log_level);
            println!();
            println!("Notifications:   {}", on_off(n.enabled));
            println!("  session quota: {}", on_off(n.session_quota));
            println!("  credits low:   {}", on_off(n.credits_low));
            println!("  failures:      {}", on_off(n.refresh_failure));
            println!("  stale usage:   {}", on_off(n.stale_usage));

            let commands: Vec<_> = settings
                .provider_settings
                .iter()
                .filter_map(|(kind, p)| p.command.as_ref().map(|c| (kind, c, &p.args)))
                .collect();
            if !commands.is_empty() {
                println!();
                println!("Commands:");
                for (kind, command, args) in commands {
                    println!("  {:<12} {} {}", kind.cli_name(), command, args.join(" "));
                }
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&settings)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli, store: &SettingsStore) -> Result<()> {
    let config_dir = default_config_dir();
    let settings_path = store.path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", settings_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "configDir": config_dir.display().to_string(),
                "settingsFile": settings_path.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

async fn set_enabled(store: &SettingsStore, name: &str, enabled: bool) -> Result<()> {
    let provider = provider_arg(name)?;
    store.set_provider_enabled(provider, enabled).await;
    store.save().await?;

    info!(provider = ?provider, enabled, "Provider toggled");
    println!(
        "{}: {}",
        if enabled { "Enabled" } else { "Disabled" },
        provider.display_name()
    );
    Ok(())
}

async fn set_command(
    store: &SettingsStore,
    name: &str,
    program: Option<&str>,
    args: &[String],
) -> Result<()> {
    let provider = provider_arg(name)?;
    let program = program.map(str::trim).filter(|p| !p.is_empty());

    store
        .set_provider_command(provider, program.map(str::to_string), args.to_vec())
        .await;
    store.save().await?;

    match program {
        Some(program) => {
            info!(provider = ?provider, program, "Provider command set");
            println!("{}: {} {}", provider.display_name(), program, args.join(" "));
        }
        None => println!("{}: command cleared", provider.display_name()),
    }
    Ok(())
}

// ============================================================================
// Parsing
// ============================================================================

fn parse_cadence(raw: &str) -> Result<RefreshCadence> {
    let cadence = match raw.trim().to_lowercase().as_str() {
        "manual" | "off" | "0" => RefreshCadence::Manual,
        "1m" => RefreshCadence::OneMinute,
        "2m" => RefreshCadence::TwoMinutes,
        "5m" => RefreshCadence::FiveMinutes,
        "15m" => RefreshCadence::FifteenMinutes,
        "30m" => RefreshCadence::ThirtyMinutes,
        other => match other.parse::<i64>() {
            Ok(seconds) if seconds > 0 => RefreshCadence::from_seconds(seconds),
            _ => bail!("Unknown cadence: {raw}. Use: manual, 1m, 2m, 5m, 15m, 30m or seconds"),
        },
    };
    Ok(cadence)
}

fn parse_log_level(raw: &str) -> Result<LogLevel> {
    let level = match raw.trim().to_lowercase().as_str() {
        "error" => LogLevel::Error,
        "warn" | "warning" => LogLevel::Warn,
        "info" => LogLevel::Info,
        "debug" => LogLevel::Debug,
        "trace" => LogLevel::Trace,
        _ => bail!("Unknown log level: {raw}. Use: error, warn, info, debug, trace"),
    };
    Ok(level)
}

fn apply_toggle(settings: &mut NotificationSettings, target: NotifyTarget, on: bool) {
    match target {
        NotifyTarget::All => settings.enabled = on,
        NotifyTarget::Session => settings.session_quota = on,
        NotifyTarget::Credits => settings.credits_low = on,
        NotifyTarget::Failure => settings.refresh_failure = on,
        NotifyTarget::Stale => settings.stale_usage = on,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotabar_core::ProviderKind;

    #[test]
    fn test_parse_cadence() {
        assert_eq!(parse_cadence("manual").unwrap(), RefreshCadence::Manual);
        assert_eq!(parse_cadence("5M").unwrap(), RefreshCadence::FiveMinutes);
        assert_eq!(parse_cadence("1000").unwrap(), RefreshCadence::FifteenMinutes);
        assert!(parse_cadence("soon").is_err());
        assert!(parse_cadence("-60").is_err());
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("Debug").unwrap(), LogLevel::Debug);
        assert!(parse_log_level("loud").is_err());
    }

    #[test]
    fn test_apply_toggle_leaves_other_categories() {
        let mut settings = NotificationSettings::default();
        apply_toggle(&mut settings, NotifyTarget::Stale, false);
        assert!(!settings.stale_usage);
        assert!(settings.enabled);
        assert!(settings.session_quota);

        apply_toggle(&mut settings, NotifyTarget::All, false);
        assert!(!settings.enabled);
        assert!(settings.credits_low);
    }

    #[tokio::test]
    async fn test_set_command_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));

        set_command(&store, "claude", Some("claude-usage"), &["--json".to_string()])
            .await
            .unwrap();
        let saved = SettingsStore::load(dir.path().join("settings.json")).await.unwrap();
        let provider = saved.provider_settings(ProviderKind::Claude).await;
        assert_eq!(provider.command.as_deref(), Some("claude-usage"));
        assert_eq!(provider.args, vec!["--json".to_string()]);

        set_command(&store, "claude", Some("  "), &[]).await.unwrap();
        assert!(store.provider_settings(ProviderKind::Claude).await.command.is_none());
    }

    #[test]
    fn test_parse_command_with_flags() {
        let cli = <crate::Cli as clap::Parser>::try_parse_from([
            "quotabar",
            "config",
            "command",
            "codex",
            "codex-usage",
            "--json",
            "--window",
            "5h",
        ])
        .unwrap();
        let crate::Commands::Config(args) = cli.command else {
            panic!("expected config");
        };
        match args.action {
            ConfigAction::Command {
                provider,
                program,
                args,
            } => {
                assert_eq!(provider, "codex");
                assert_eq!(program.as_deref(), Some("codex-usage"));
                assert_eq!(args, vec!["--json", "--window", "5h"]);
            }
            _ => panic!("expected command"),
        }
    }
}
