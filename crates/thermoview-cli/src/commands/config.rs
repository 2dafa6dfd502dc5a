//! Config command implementation.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::cli::ConfigAction;
use thermoview_cli::config::Config;

pub fn cmd_config(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", Config::path().display());
        }
        ConfigAction::Show => {
            let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
            print!("{content}");
            if let Err(e) = config.validate() {
                eprintln!("Warning: {:#}", e);
            }
        }
        ConfigAction::Init { force } => {
            let path = Config::path();
            init_config(&path, force)?;
            println!("Wrote default config to {}", path.display());
        }
    }
    Ok(())
}

/// Write a default config to `path`, refusing to overwrite unless `force`.
fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config file already exists: {}\nUse --force to overwrite it.",
            path.display()
        );
    }
    Config::default().save_to(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thermoview").join("config.toml");
        init_config(&path, false).unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "device_name = \"Bench\"\n").unwrap();

        assert!(init_config(&path, false).is_err());
        assert_eq!(Config::load_from(&path).device_name, "Bench");

        init_config(&path, true).unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }
}
