//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thermoview_core::render::{DEFAULT_CANVAS_SIZE, DEFAULT_RASTER_SIZE, MaskShape};
use thermoview_core::uuid::DEVICE_NAME;
use thermoview_core::{ConnectionConfig, LinkConfig, RenderOptions, SubscribePolicy};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Advertised name of the peripheral to connect to
    pub device_name: String,

    /// How long to scan before giving up, in seconds
    pub scan_timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// What happens to earlier subscriptions when a later one fails
    pub subscribe_policy: SubscribePolicy,

    /// Heat-map rendering settings
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_name: DEVICE_NAME.to_string(),
            scan_timeout_secs: 10,
            connect_timeout_secs: 15,
            subscribe_policy: SubscribePolicy::default(),
            render: RenderConfig::default(),
        }
    }
}

/// Heat-map rendering settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Canvas side length in pixels
    pub canvas_size: usize,

    /// Side length of the interpolated raster
    pub raster_size: usize,

    /// Horizontal mask radius as a fraction of the canvas width
    pub mask_rx: f64,

    /// Vertical mask radius as a fraction of the canvas height
    pub mask_ry: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let mask = MaskShape::default();
        Self {
            canvas_size: DEFAULT_CANVAS_SIZE,
            raster_size: DEFAULT_RASTER_SIZE,
            mask_rx: mask.rx_ratio,
            mask_ry: mask.ry_ratio,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("thermoview")
            .join("config.toml")
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from `path`, falling back to defaults with a warning.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    eprintln!("Warning: Failed to read config: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    /// Save config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Scan timeout as a [`Duration`].
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    /// BLE connection timeouts.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::default()
            .connection_timeout(Duration::from_secs(self.connect_timeout_secs))
    }

    /// Link manager settings.
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig::new()
            .device_name(self.device_name.clone())
            .policy(self.subscribe_policy)
    }

    /// Renderer settings.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions::default()
            .raster_size(self.render.raster_size)
            .mask(self.render.mask_rx, self.render.mask_ry)
    }

    /// Check every field that has a constrained range.
    pub fn validate(&self) -> Result<()> {
        if self.scan_timeout_secs == 0 {
            anyhow::bail!("scan_timeout_secs must be greater than zero");
        }
        if self.connect_timeout_secs == 0 {
            anyhow::bail!("connect_timeout_secs must be greater than zero");
        }
        if self.render.canvas_size == 0 {
            anyhow::bail!("render.canvas_size must be greater than zero");
        }
        self.link_config()
            .validate()
            .context("Invalid link settings")?;
        self.render_options()
            .validate()
            .context("Invalid render settings")?;
        Ok(())
    }
}

/// Resolve timeout: use provided value, fall back to config
pub fn resolve_timeout(cmd_timeout: Option<u64>, config_timeout: u64) -> Duration {
    Duration::from_secs(cmd_timeout.unwrap_or(config_timeout))
}
