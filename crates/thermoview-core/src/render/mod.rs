//! Heat-map rendering.
//!
//! Each frame goes through the same steps:
//!
//! 1. Normalise against the grid's own min and max ([`ColorScale`]).
//! 2. Upsample the 8x8 grid bilinearly to a square raster ([`RasterFrame`]).
//! 3. Clear the canvas.
//! 4. Paint one square per raster sample, scaled to the canvas width.
//! 5. Clip to a centred ellipse with [`CompositeOp::DestinationIn`].
//! 6. Restore [`CompositeOp::SourceOver`].
//!
//! Values outside the visible ellipse still take part in normalisation.

pub mod canvas;
pub mod color;
pub mod interpolate;

use tracing::trace;

use thermoview_types::ThermalGrid;

use crate::error::{Error, Result};

pub use canvas::{Canvas, CompositeOp};
pub use color::{ColorScale, Rgba, hsl_to_rgb};
pub use interpolate::{RasterFrame, bilinear_sample};

/// Default side length of the interpolated raster.
pub const DEFAULT_RASTER_SIZE: usize = 64;

/// Default canvas side length in pixels.
pub const DEFAULT_CANVAS_SIZE: usize = 320;

/// Elliptical clip applied after painting.
///
/// Radii are fractions of the canvas width and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskShape {
    pub rx_ratio: f64,
    pub ry_ratio: f64,
}

impl Default for MaskShape {
    fn default() -> Self {
        Self {
            rx_ratio: 0.45,
            ry_ratio: 0.48,
        }
    }
}

/// Renderer settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Side length of the interpolated raster.
    pub raster_size: usize,
    /// Elliptical clip.
    pub mask: MaskShape,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            raster_size: DEFAULT_RASTER_SIZE,
            mask: MaskShape::default(),
        }
    }
}

impl RenderOptions {
    /// Set the raster size.
    #[must_use]
    pub fn raster_size(mut self, size: usize) -> Self {
        self.raster_size = size;
        self
    }

    /// Set the mask radii as fractions of canvas width and height.
    #[must_use]
    pub fn mask(mut self, rx_ratio: f64, ry_ratio: f64) -> Self {
        self.mask = MaskShape { rx_ratio, ry_ratio };
        self
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<()> {
        if self.raster_size < 2 {
            return Err(Error::invalid_config(format!(
                "raster size must be at least 2, got {}",
                self.raster_size
            )));
        }
        for (name, ratio) in [("mask_rx", self.mask.rx_ratio), ("mask_ry", self.mask.ry_ratio)] {
            if !(ratio > 0.0 && ratio <= 0.5) {
                return Err(Error::invalid_config(format!(
                    "{name} must be in (0, 0.5], got {ratio}"
                )));
            }
        }
        Ok(())
    }
}

/// Paint one heat-map frame of `grid` onto `canvas`.
pub fn paint_heatmap(canvas: &mut Canvas, grid: &ThermalGrid, options: &RenderOptions) {
    let scale = ColorScale::from_grid(grid);
    let raster = RasterFrame::from_grid(grid, options.raster_size);

    canvas.set_composite(CompositeOp::SourceOver);
    canvas.clear();

    let (width, height) = (canvas.width() as f64, canvas.height() as f64);
    let cell = width / raster.size() as f64;
    for y in 0..raster.size() {
        for x in 0..raster.size() {
            // NaN samples have no hue and stay transparent.
            if let Some(color) = scale.color(raster.get(x, y)) {
                canvas.fill_rect(x as f64 * cell, y as f64 * cell, cell, cell, color);
            }
        }
    }

    canvas.set_composite(CompositeOp::DestinationIn);
    canvas.fill_ellipse(
        width / 2.0,
        height / 2.0,
        width * options.mask.rx_ratio,
        height * options.mask.ry_ratio,
        Rgba::BLACK,
    );
    canvas.set_composite(CompositeOp::SourceOver);
}

/// Draws frames onto an attached canvas.
///
/// With no canvas attached, [`Renderer::render`] does nothing. Detaching
/// lets a front-end tear down its surface while updates keep arriving.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
    canvas: Option<Canvas>,
    frames: u64,
}

impl Renderer {
    /// Renderer with no canvas attached.
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            canvas: None,
            frames: 0,
        }
    }

    /// Renderer drawing onto a fresh `width` x `height` canvas.
    pub fn with_canvas(options: RenderOptions, width: usize, height: usize) -> Result<Self> {
        options.validate()?;
        let mut renderer = Self::new(options);
        renderer.attach(Canvas::new(width, height)?);
        Ok(renderer)
    }

    /// The renderer options.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Attach a canvas, replacing any previous one.
    pub fn attach(&mut self, canvas: Canvas) {
        self.canvas = Some(canvas);
    }

    /// Detach and return the canvas.
    pub fn detach(&mut self) -> Option<Canvas> {
        self.canvas.take()
    }

    /// Whether a canvas is attached.
    pub fn is_attached(&self) -> bool {
        self.canvas.is_some()
    }

    /// The attached canvas.
    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    /// Number of frames drawn so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Draw `grid`. Returns the canvas, or `None` if none is attached.
    pub fn render(&mut self, grid: &ThermalGrid) -> Option<&Canvas> {
        let Some(canvas) = self.canvas.as_mut() else {
            trace!("No canvas attached, skipping frame");
            return None;
        };
        paint_heatmap(canvas, grid, &self.options);
        self.frames += 1;
        Some(canvas)
    }
}
