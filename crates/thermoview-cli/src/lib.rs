//! Command-line interface for BLE thermal camera sensors.
//!
//! The peripheral streams an 8x8 temperature grid plus average and maximum
//! readings. This crate connects to it, prints the decoded values, renders
//! heat-maps to PNG and runs an interactive terminal dashboard.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scan` | List nearby thermal sensors by name (`--all` for every peripheral) |
//! | `watch` | Connect and print every decoded update |
//! | `render` | Render a raw grid payload to a PNG heat-map |
//! | `tui` | Interactive heat-map dashboard |
//! | `config` | Manage CLI configuration |
//! | `completions` | Generate shell completions |
//!
//! # Configuration
//!
//! The CLI stores configuration in `~/.config/thermoview/config.toml` (or
//! platform equivalent). See [`config::Config`] for the available keys.
//!
//! # Examples
//!
//! Scan for sensors:
//! ```bash
//! thermoview scan
//! ```
//!
//! Stream updates as JSON:
//! ```bash
//! thermoview watch --format json --count 10
//! ```
//!
//! Render a captured payload:
//! ```bash
//! thermoview render --input frame.txt --output frame.png
//! ```
//!
//! Try the dashboard without hardware:
//! ```bash
//! thermoview tui --demo
//! ```

pub mod config;
pub mod format;

// Re-export core dependencies for convenience
pub use thermoview_core;
pub use thermoview_types;

#[cfg(feature = "tui")]
pub mod tui;
