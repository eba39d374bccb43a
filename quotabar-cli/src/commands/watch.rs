//! Watch command - run the monitor until interrupted.

use anyhow::Result;
use chrono::{Local, Utc};
use clap::Args;
use quotabar_engine::{
    DesktopSink, LogSink, Monitor, MonitorEvent, Notification, NotificationSink,
    RefreshOrchestrator,
};
use quotabar_store::SettingsStore;
use std::io::{Write, stdout};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::context::{build_orchestrator, build_registry};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Refresh interval in seconds, overriding the configured cadence (0 for manual).
    #[arg(long, short)]
    pub interval: Option<i64>,

    /// Log alerts instead of showing desktop notifications.
    #[arg(long)]
    pub no_notify: bool,
}

/// Runs the watch command.
pub async fn run(args: &WatchArgs, cli: &Cli, settings: Arc<SettingsStore>) -> Result<()> {
    let orchestrator = build_orchestrator(&settings).await;
    let sink: Arc<dyn NotificationSink> = if args.no_notify {
        Arc::new(LogSink)
    } else {
        Arc::new(DesktopSink::new())
    };

    let (monitor, handle) = Monitor::new(Arc::clone(&orchestrator), Arc::clone(&settings), sink);
    let mut monitor = monitor.with_registry_factory(build_registry);
    if let Some(seconds) = args.interval {
        monitor = monitor.with_interval(seconds);
    }
    let mut interval = match args.interval {
        Some(seconds) => seconds,
        None => settings.refresh_interval_seconds().await,
    };

    let mut events = handle.subscribe();
    let task = tokio::spawn(monitor.run());
    info!(interval, notify = !args.no_notify, "Starting watch mode");

    let view = View {
        text: TextFormatter::new(!cli.no_color),
        json: JsonFormatter::new(cli.pretty),
        format: cli.format,
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping monitor");
                handle.shutdown();
            }
            event = events.recv() => match event {
                Ok(MonitorEvent::Refreshed { notifications, .. }) => {
                    view.refreshed(&orchestrator, interval, &notifications).await?;
                }
                Ok(MonitorEvent::StaleDetected { notifications }) => {
                    view.alerts(&notifications)?;
                }
                Ok(MonitorEvent::SettingsApplied { refresh_interval_seconds }) => {
                    interval = refresh_interval_seconds;
                }
                Ok(MonitorEvent::Stopped) | Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Display fell behind monitor events");
                }
            }
        }
    }

    task.await?;
    Ok(())
}

struct View {
    text: TextFormatter,
    json: JsonFormatter,
    format: OutputFormat,
}

impl View {
    async fn refreshed(
        &self,
        orchestrator: &RefreshOrchestrator,
        interval: i64,
        notifications: &[Notification],
    ) -> Result<()> {
        let states = orchestrator.states().await;
        let now = Utc::now();

        match self.format {
            OutputFormat::Text => {
                // Clear screen
                print!("\x1b[2J\x1b[H");
                stdout().flush()?;

                println!(
                    "QuotaBar Watch - {} (refresh: {})",
                    Local::now().format("%H:%M:%S"),
                    cadence_label(interval)
                );
                println!("{}", "─".repeat(50));
                println!();
                println!("{}", self.text.format_summary(&states, interval, now));
                if !notifications.is_empty() {
                    println!();
                    self.alerts(notifications)?;
                }
                println!();
                println!("{}", self.text.dim("Press Ctrl+C to exit"));
            }
            OutputFormat::Json => {
                let enabled: Vec<_> = states.into_iter().filter(|s| s.enabled).collect();
                println!("{}", self.json.format_states(&enabled, interval, now)?);
                self.alerts(notifications)?;
            }
        }
        Ok(())
    }

    fn alerts(&self, notifications: &[Notification]) -> Result<()> {
        if notifications.is_empty() {
            return Ok(());
        }
        match self.format {
            OutputFormat::Text => {
                for notification in notifications {
                    println!("{}", self.text.format_notification(notification));
                }
            }
            OutputFormat::Json => {
                println!("{}", self.json.format_notifications(notifications)?);
            }
        }
        Ok(())
    }
}

fn cadence_label(interval: i64) -> String {
    if interval <= 0 {
        "manual".to_string()
    } else if interval % 60 == 0 {
        format!("{}m", interval / 60)
    } else {
        format!("{interval}s")
    }
}
