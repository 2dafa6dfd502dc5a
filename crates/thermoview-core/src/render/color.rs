//! Temperature to colour mapping.
//!
//! Values are normalised against the current grid's range and mapped onto
//! the HSL hue wheel from blue (240°, coldest) to red (0°, hottest) at full
//! saturation and 50% lightness.

use thermoview_types::ThermalGrid;

/// Hue of the coldest value, in degrees.
pub const COLD_HUE: f64 = 240.0;

/// An 8-bit RGBA colour, not premultiplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn is_transparent(self) -> bool {
        self.a == 0
    }
}

/// Convert HSL to an opaque RGB colour.
///
/// `hue` is in degrees and wraps; `saturation` and `lightness` are in `0..=1`.
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> Rgba {
    let hue = hue.rem_euclid(360.0);
    let saturation = saturation.clamp(0.0, 1.0);
    let lightness = lightness.clamp(0.0, 1.0);

    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba::opaque(channel(r), channel(g), channel(b))
}

/// Per-frame normalisation derived from one grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    min: f64,
    span: f64,
}

impl ColorScale {
    /// Scale spanning `min..=max`.
    ///
    /// A zero or NaN span is replaced by 1 so a flat grid still maps every
    /// value to the cold end. An infinite span is kept: every finite value
    /// then normalises to 0.
    pub fn new(min: f64, max: f64) -> Self {
        let span = max - min;
        let span = if span == 0.0 || span.is_nan() {
            1.0
        } else {
            span
        };
        Self { min, span }
    }

    /// Scale spanning the non-NaN range of `grid`.
    pub fn from_grid(grid: &ThermalGrid) -> Self {
        let (min, max) = grid.min_max().unwrap_or((0.0, 0.0));
        Self::new(min, max)
    }

    /// Lower end of the range.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// `(value - min) / span`.
    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.min) / self.span
    }

    /// Hue in degrees for `value`: 240 at the minimum, 0 at the maximum.
    pub fn hue(&self, value: f64) -> f64 {
        (1.0 - self.normalize(value)) * COLD_HUE
    }

    /// Colour for `value`, or `None` when it cannot be placed on the scale.
    pub fn color(&self, value: f64) -> Option<Rgba> {
        let hue = self.hue(value);
        hue.is_finite().then(|| hsl_to_rgb(hue, 1.0, 0.5))
    }
}
