//! Visual styling utilities for the CLI.
//!
//! Spinners for long-running BLE operations, colored temperatures and the
//! RSSI signal bar shown by `scan`.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use thermoview_cli::format::format_celsius;

/// Standard spinner tick characters (Braille dots animation)
const SPINNER_TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Standard spinner tick interval
const SPINNER_TICK_MS: u64 = 80;

/// Temperature thresholds (°C) for coloring readouts.
pub mod temperature {
    pub const COLD: f64 = 18.0; // Cyan below
    pub const WARM: f64 = 30.0; // Orange above
    pub const HOT: f64 = 45.0; // Red above
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_TICK_CHARS)
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
    pb
}

/// Create a spinner for scanning operations.
pub fn scanning_spinner(timeout: Duration) -> ProgressBar {
    spinner(format!(
        "Scanning for thermal sensors... ({}s)",
        timeout.as_secs()
    ))
}

/// Create a spinner for connecting to a device.
pub fn connecting_spinner(device: &str) -> ProgressBar {
    spinner(format!("Connecting to {}...", device))
}

/// Format a temperature, colored by how warm it is.
pub fn format_temp_colored(celsius: f64, no_color: bool) -> String {
    let formatted = format_celsius(celsius);
    if no_color || celsius.is_nan() {
        return formatted;
    }

    if celsius < temperature::COLD {
        format!("{}", formatted.cyan())
    } else if celsius > temperature::HOT {
        format!("{}", formatted.red().bold())
    } else if celsius > temperature::WARM {
        // Orange color (RGB: 255, 165, 0)
        format!("{}", formatted.truecolor(255, 165, 0))
    } else {
        format!("{}", formatted.green())
    }
}

/// Format RSSI as a visual signal bar.
/// RSSI typically ranges from -100 dBm (weak) to -30 dBm (strong).
pub fn format_signal_bar(rssi: Option<i16>, no_color: bool) -> String {
    let Some(rssi) = rssi else {
        return "N/A".to_string();
    };

    // -30 dBm = excellent (10), -100 dBm = very weak (0)
    let filled = (((rssi + 100).clamp(0, 70) as f32 / 7.0).round() as usize).min(10);
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled));

    if no_color {
        format!("{} {:>3}", bar, rssi)
    } else if filled >= 7 {
        format!("{} {:>3}", bar.green(), rssi)
    } else if filled >= 4 {
        format!("{} {:>3}", bar.yellow(), rssi)
    } else {
        format!("{} {:>3}", bar.red(), rssi)
    }
}
