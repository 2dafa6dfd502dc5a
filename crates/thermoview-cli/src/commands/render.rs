//! Render command implementation.
//!
//! Renders one raw grid payload offline, with the same pipeline the
//! dashboard uses, and writes the canvas as an RGBA PNG.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use image::{ImageFormat, RgbaImage};
use thermoview_core::{RenderOptions, Renderer, ThermalGrid};

use thermoview_cli::config::Config;
use thermoview_cli::format::format_grid_summary;

/// Arguments for the render command.
pub struct RenderArgs<'a> {
    pub payload: Option<String>,
    pub input: Option<PathBuf>,
    pub output: PathBuf,
    pub size: Option<u32>,
    pub quiet: bool,
    pub config: &'a Config,
}

pub fn cmd_render(args: RenderArgs<'_>) -> Result<()> {
    let RenderArgs {
        payload,
        input,
        output,
        size,
        quiet,
        config,
    } = args;

    let payload = read_payload(payload, input.as_deref())?;
    let grid = ThermalGrid::from_payload(payload.as_bytes()).context("Invalid grid payload")?;

    let size = size.unwrap_or(u32::try_from(config.render.canvas_size).unwrap_or(u32::MAX));
    render_png(&grid, config.render_options(), size, &output)?;

    if !quiet {
        eprintln!(
            "Rendered {}x{} heat-map to {} ({})",
            size,
            size,
            output.display(),
            format_grid_summary(&grid)
        );
    }
    Ok(())
}

/// Payload text from `--payload` or the file named by `--input`.
fn read_payload(payload: Option<String>, input: Option<&Path>) -> Result<String> {
    match (payload, input) {
        (Some(payload), _) => Ok(payload),
        (None, Some(path)) => fs::read_to_string(path)
            .map(|s| s.trim_end().to_string())
            .with_context(|| format!("Failed to read payload: {}", path.display())),
        (None, None) => Err(anyhow!("No payload given. Use --payload or --input.")),
    }
}

/// Render `grid` onto a `size` x `size` canvas and save it as PNG.
fn render_png(grid: &ThermalGrid, options: RenderOptions, size: u32, path: &Path) -> Result<()> {
    let side = size as usize;
    let mut renderer =
        Renderer::with_canvas(options, side, side).context("Failed to create canvas")?;
    renderer.render(grid);
    let canvas = renderer
        .detach()
        .ok_or_else(|| anyhow!("Renderer has no canvas attached"))?;

    let image = RgbaImage::from_raw(size, size, canvas.into_rgba())
        .ok_or_else(|| anyhow!("Canvas size does not match {}x{}", size, size))?;
    image
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to write PNG: {}", path.display()))?;
    Ok(())
}
