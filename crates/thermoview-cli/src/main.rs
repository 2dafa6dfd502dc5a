use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use thermoview_cli::config::Config;
use thermoview_cli::format::FormatOptions;

mod cli;
mod commands;
mod style;

use cli::{Cli, Commands};
use commands::{RenderArgs, WatchArgs};

/// Build the log filter from the global flags.
///
/// `--quiet` suppresses info-level logging, `--verbose` enables debug.
/// Otherwise `RUST_LOG` applies, defaulting to info.
fn log_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install the tracing subscriber, writing to `log_file` when given.
fn init_tracing(filter: EnvFilter, log_file: Option<&Path>) -> Result<()> {
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "thermoview", &mut io::stdout());
        return Ok(());
    }

    // The dashboard owns the terminal, so it only logs to a file.
    #[cfg(feature = "tui")]
    let log_to_terminal = !matches!(cli.command, Commands::Tui { .. });
    #[cfg(not(feature = "tui"))]
    let log_to_terminal = true;

    if log_to_terminal || cli.log_file.is_some() {
        init_tracing(log_filter(cli.verbose, cli.quiet), cli.log_file.as_deref())?;
    }

    let config = Config::load();
    if !matches!(cli.command, Commands::Config { .. }) {
        config.validate().with_context(|| {
            format!("Invalid configuration in {}", Config::path().display())
        })?;
    }
    let opts = FormatOptions::new(cli.no_color);

    match cli.command {
        Commands::Scan {
            timeout,
            format,
            all,
        } => commands::cmd_scan(timeout, format, all, cli.quiet, &opts, &config).await,
        Commands::Watch {
            device,
            format,
            count,
            policy,
            compact,
        } => {
            commands::cmd_watch(WatchArgs {
                device,
                format,
                count,
                policy,
                quiet: cli.quiet,
                opts: opts.with_compact(compact),
                config: &config,
            })
            .await
        }
        Commands::Render {
            payload,
            input,
            output,
            size,
        } => commands::cmd_render(RenderArgs {
            payload,
            input,
            output,
            size,
            quiet: cli.quiet,
            config: &config,
        }),
        #[cfg(feature = "tui")]
        Commands::Tui { demo } => thermoview_cli::tui::run(config, demo).await,
        Commands::Config { action } => commands::cmd_config(action, &config),
        Commands::Completions { .. } => {
            // Already handled above
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_flags() {
        assert_eq!(log_filter(false, true).to_string(), "warn");
        assert_eq!(log_filter(true, false).to_string(), "debug");
    }
}
