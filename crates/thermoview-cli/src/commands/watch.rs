//! Watch command implementation.
//!
//! Holds one BLE session open and prints every decoded update until Ctrl+C
//! or until `--count` updates have been printed. Updates are read from the
//! shared state channel, so a burst of notifications between two wakeups is
//! coalesced into the latest value per characteristic.

use anyhow::{Context, Result};
use chrono::Local;
use owo_colors::OwoColorize;
use thermoview_core::{
    BleProvider, LinkEvent, LinkManager, SubscribePolicy, ThermalSnapshot, ThermalUpdate,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::cli::OutputFormat;
use crate::style;
use thermoview_cli::config::Config;
use thermoview_cli::format::{
    FormatOptions, format_grid_summary, format_update_json, format_update_text,
};

/// Arguments for the watch command.
pub struct WatchArgs<'a> {
    pub device: Option<String>,
    pub format: OutputFormat,
    pub count: u64,
    pub policy: Option<SubscribePolicy>,
    pub quiet: bool,
    pub opts: FormatOptions,
    pub config: &'a Config,
}

pub async fn cmd_watch(args: WatchArgs<'_>) -> Result<()> {
    let WatchArgs {
        device,
        format,
        count,
        policy,
        quiet,
        opts,
        config,
    } = args;

    let mut link_config = config.link_config();
    if let Some(name) = device {
        link_config = link_config.device_name(name);
    }
    if let Some(policy) = policy {
        link_config = link_config.policy(policy);
    }
    link_config.validate().context("Invalid link settings")?;

    let provider = BleProvider::new(config.scan_timeout(), config.connection_config());
    let link = LinkManager::new(provider, link_config);
    let target = link.config().filter.name.clone();

    let spinner = (!quiet).then(|| style::connecting_spinner(&target));
    let connected = link.try_connect().await;
    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }
    connected.with_context(|| format!("Failed to connect to {}", target))?;

    if !quiet {
        let device = link
            .connected_device()
            .await
            .map(|d| d.id)
            .unwrap_or_default();
        let header = if opts.no_color {
            format!("Watching: {} ({})", target, device)
        } else {
            format!("Watching: {} ({})", target.green(), device.cyan())
        };
        eprintln!("{}", header);
        if count > 0 {
            eprintln!("Count: {} | Press Ctrl+C to stop", count);
        } else {
            eprintln!("Press Ctrl+C to stop");
        }
        eprintln!("{}", "-".repeat(50));
    }

    let mut updates = link.watch();
    let mut events = link.events();
    let mut previous = updates.borrow_and_update().clone();
    let mut printed: u64 = 0;

    'watch: loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nShutting down...");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = updates.borrow_and_update().clone();
                for update in changed_fields(&previous, &current) {
                    let line = match format {
                        OutputFormat::Json => {
                            format_update_json(&update, &Local::now().to_rfc3339(), &opts)?
                        }
                        OutputFormat::Text => format_watch_line(&update, &opts),
                    };
                    print!("{line}");
                    printed += 1;
                    if count > 0 && printed >= count {
                        if !quiet {
                            eprintln!("Completed {} updates.", printed);
                        }
                        break 'watch;
                    }
                }
                previous = current;
            }
            event = events.recv() => match event {
                Ok(LinkEvent::PayloadDiscarded { characteristic, reason }) => {
                    if !quiet {
                        eprintln!("Discarded payload from {}: {}", characteristic, reason);
                    }
                }
                Ok(other) => debug!(?other, "Link event"),
                Err(RecvError::Lagged(n)) => debug!("Missed {} link events", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    link.disconnect().await.context("Failed to disconnect")?;
    Ok(())
}

/// Updates between two snapshots, in characteristic order: grid, average, max.
fn changed_fields(previous: &ThermalSnapshot, current: &ThermalSnapshot) -> Vec<ThermalUpdate> {
    let mut updates = Vec::with_capacity(3);
    if current.grid_revision != previous.grid_revision {
        updates.push(ThermalUpdate::Grid(current.grid));
    }
    if current.average_revision != previous.average_revision {
        updates.push(ThermalUpdate::Average(current.average));
    }
    if current.maximum_revision != previous.maximum_revision {
        updates.push(ThermalUpdate::Maximum(current.maximum));
    }
    updates
}

/// Format a watch line, coloring temperatures unless disabled.
fn format_watch_line(update: &ThermalUpdate, opts: &FormatOptions) -> String {
    let timestamp = Local::now().format("%H:%M:%S").to_string();
    if opts.no_color {
        return format_update_text(update, &timestamp);
    }

    let body = match update {
        ThermalUpdate::Grid(grid) => format_grid_summary(grid),
        ThermalUpdate::Average(v) => {
            format!("Average: {}", style::format_temp_colored(*v, false))
        }
        ThermalUpdate::Maximum(v) => format!("Max: {}", style::format_temp_colored(*v, false)),
    };
    format!("[{}] {}\n", timestamp.dimmed(), body)
}
