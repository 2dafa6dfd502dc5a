//! Output formatting for readouts and decoded updates.

use anyhow::Result;
use serde::Serialize;
use thermoview_core::{ThermalGrid, ThermalUpdate};

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool) -> Self {
        Self {
            no_color,
            compact: false,
        }
    }

    /// Create with compact JSON option.
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Serialize value to JSON string, respecting compact option.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json)
    }
}

/// Format a temperature with two decimals and a degree suffix.
///
/// Non-finite values keep their name: `NaN °C`, `Infinity °C`.
#[must_use]
pub fn format_celsius(value: f64) -> String {
    if value.is_nan() {
        "NaN °C".to_string()
    } else if value.is_infinite() {
        let sign = if value.is_sign_negative() { "-" } else { "" };
        format!("{sign}Infinity °C")
    } else {
        format!("{value:.2} °C")
    }
}

/// `Average: 23.50 °C`
#[must_use]
pub fn format_average(value: f64) -> String {
    format!("Average: {}", format_celsius(value))
}

/// `Max: 41.00 °C`
#[must_use]
pub fn format_maximum(value: f64) -> String {
    format!("Max: {}", format_celsius(value))
}

/// One-line summary of a grid: its coldest and hottest cells.
#[must_use]
pub fn format_grid_summary(grid: &ThermalGrid) -> String {
    match grid.min_max() {
        Some((min, max)) => format!(
            "Grid: min {} | max {}",
            format_celsius(min),
            format_celsius(max)
        ),
        None => "Grid: no numeric values".to_string(),
    }
}

/// Text line for one decoded update, prefixed by `timestamp`.
#[must_use]
pub fn format_update_text(update: &ThermalUpdate, timestamp: &str) -> String {
    let body = match update {
        ThermalUpdate::Grid(grid) => format_grid_summary(grid),
        ThermalUpdate::Average(v) => format_average(*v),
        ThermalUpdate::Maximum(v) => format_maximum(*v),
    };
    format!("[{timestamp}] {body}\n")
}

/// JSON document for one decoded update.
///
/// NaN readings serialize as `null`.
pub fn format_update_json(
    update: &ThermalUpdate,
    timestamp: &str,
    opts: &FormatOptions,
) -> Result<String> {
    #[derive(Serialize)]
    struct UpdateJson<'a> {
        timestamp: &'a str,
        #[serde(flatten)]
        update: &'a ThermalUpdate,
    }

    let mut json = opts.as_json(&UpdateJson { timestamp, update })?;
    json.push('\n');
    Ok(json)
}
