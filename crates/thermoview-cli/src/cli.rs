//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use thermoview_core::SubscribePolicy;

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "thermoview")]
#[command(author, version, about = "CLI for BLE thermal camera sensors", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan for nearby thermal sensors
    Scan {
        /// Scan timeout in seconds (defaults to the configured value)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// List every peripheral, not only those named like the sensor
        #[arg(short, long)]
        all: bool,
    },

    /// Connect and print every decoded update until Ctrl+C
    Watch {
        /// Advertised device name, or use THERMOVIEW_DEVICE env var
        #[arg(short, long, env = "THERMOVIEW_DEVICE")]
        device: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Stop after this many updates (0 for unlimited)
        #[arg(short = 'n', long, default_value = "0")]
        count: u64,

        /// Handling of partial subscription failures (rollback, keep-partial)
        #[arg(long, value_parser = parse_policy)]
        policy: Option<SubscribePolicy>,

        /// Output compact JSON (one object per line)
        #[arg(long)]
        compact: bool,
    },

    /// Render a raw grid payload to a PNG heat-map
    #[command(group(ArgGroup::new("source").required(true).args(["payload", "input"])))]
    Render {
        /// Raw grid payload: 64 comma-separated values, row-major
        #[arg(short, long)]
        payload: Option<String>,

        /// File holding a raw grid payload
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Output PNG path
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Canvas side length in pixels (defaults to the configured value)
        #[arg(short, long)]
        size: Option<u32>,
    },

    /// Interactive heat-map dashboard
    #[cfg(feature = "tui")]
    Tui {
        /// Use a simulated sensor instead of BLE hardware
        #[arg(long)]
        demo: bool,
    },

    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Show config file path
    Path,
    /// Show current configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_policy(s: &str) -> Result<SubscribePolicy, String> {
    s.parse().map_err(|e: thermoview_core::Error| e.to_string())
}
