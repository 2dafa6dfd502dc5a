//! Scan command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use thermoview_core::scan::{self, DiscoveredDevice, ScanOptions};

use crate::cli::OutputFormat;
use crate::style;
use thermoview_cli::config::{Config, resolve_timeout};
use thermoview_cli::format::FormatOptions;

pub async fn cmd_scan(
    timeout: Option<u64>,
    format: OutputFormat,
    all: bool,
    quiet: bool,
    opts: &FormatOptions,
    config: &Config,
) -> Result<()> {
    let duration = resolve_timeout(timeout, config.scan_timeout_secs);

    // Show spinner for text output (unless quiet)
    let spinner = if !quiet && matches!(format, OutputFormat::Text) {
        Some(style::scanning_spinner(duration))
    } else {
        None
    };

    let devices = scan::scan_with_options(scan_options(duration, all, config))
        .await
        .context("Failed to scan for devices")?;

    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }

    let content = match format {
        OutputFormat::Json => format_scan_json(&devices, duration, opts)?,
        OutputFormat::Text => format_scan_text(&devices, &config.device_name, opts),
    };
    print!("{content}");
    Ok(())
}

/// Scan for the configured sensor name, or for everything with `--all`.
fn scan_options(duration: Duration, all: bool, config: &Config) -> ScanOptions {
    let options = ScanOptions::new().duration(duration);
    if all {
        options.all_devices()
    } else {
        options.device_name(config.device_name.as_str())
    }
}

fn format_scan_json(
    devices: &[DiscoveredDevice],
    duration: Duration,
    opts: &FormatOptions,
) -> Result<String> {
    #[derive(Serialize)]
    struct ScanResult<'a> {
        count: usize,
        scan_secs: u64,
        devices: Vec<DeviceJson<'a>>,
    }

    #[derive(Serialize)]
    struct DeviceJson<'a> {
        name: Option<&'a str>,
        address: &'a str,
        identifier: &'a str,
        rssi: Option<i16>,
        thermal_service: bool,
    }

    let result = ScanResult {
        count: devices.len(),
        scan_secs: duration.as_secs(),
        devices: devices
            .iter()
            .map(|d| DeviceJson {
                name: d.name.as_deref(),
                address: &d.address,
                identifier: &d.identifier,
                rssi: d.rssi,
                thermal_service: d.advertises_thermal_service,
            })
            .collect(),
    };

    let mut json = opts.as_json(&result)?;
    json.push('\n');
    Ok(json)
}

/// Table of discovered peripherals. The configured sensor is marked with `*`.
fn format_scan_text(devices: &[DiscoveredDevice], target: &str, opts: &FormatOptions) -> String {
    if devices.is_empty() {
        return "No thermal sensors found.\n".to_string();
    }

    #[derive(Tabled)]
    struct DeviceRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Thermal")]
        thermal: &'static str,
        #[tabled(rename = "Signal")]
        signal: String,
        #[tabled(rename = "Identifier")]
        identifier: String,
    }

    let rows: Vec<DeviceRow> = devices
        .iter()
        .map(|d| {
            let name = d.name.as_deref().unwrap_or("Unknown");
            let marker = if name == target { " *" } else { "" };
            DeviceRow {
                name: if opts.no_color {
                    format!("{name}{marker}")
                } else {
                    format!("{}{}", name.cyan(), marker)
                },
                thermal: if d.advertises_thermal_service {
                    "yes"
                } else {
                    "no"
                },
                signal: style::format_signal_bar(d.rssi, opts.no_color),
                identifier: d.identifier.clone(),
            }
        })
        .collect();

    let count = if opts.no_color {
        devices.len().to_string()
    } else {
        devices.len().to_string().green().bold().to_string()
    };

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    format!("Found {} device(s)\n\n{}\n", count, table)
}
