//! RGBA pixel surface with the two compositing modes the heat-map needs.
//!
//! Shapes cover a pixel when the pixel centre lies inside them. There is no
//! anti-aliasing.

use crate::error::{Error, Result};

use super::color::Rgba;

/// How a filled shape combines with existing pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeOp {
    /// Paint over existing content.
    #[default]
    SourceOver,
    /// Keep existing content only where the shape is drawn, scaled by the
    /// shape's alpha. Everything outside the shape becomes transparent.
    DestinationIn,
}

/// RGBA pixel surface, row-major, not premultiplied.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    composite: CompositeOp,
}

impl Canvas {
    /// Create a transparent canvas. Both dimensions must be non-zero.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_config(format!(
                "canvas size must be non-zero, got {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: vec![0; width * height * 4],
            composite: CompositeOp::SourceOver,
        })
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Current compositing mode.
    pub fn composite(&self) -> CompositeOp {
        self.composite
    }

    /// Set the compositing mode for subsequent fills.
    pub fn set_composite(&mut self, op: CompositeOp) {
        self.composite = op;
    }

    /// Clear to transparent black.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Colour of the pixel at `x`, `y`, or `None` outside the canvas.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        let p = &self.pixels[i..i + 4];
        Some(Rgba::new(p[0], p[1], p[2], p[3]))
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_rgba(&self) -> &[u8] {
        &self.pixels
    }

    /// Consume the canvas returning the owned pixel vector.
    pub fn into_rgba(self) -> Vec<u8> {
        self.pixels
    }

    /// Fill the axis-aligned rectangle at `x`, `y` of size `w` x `h`.
    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgba) {
        let inside = |px: f64, py: f64| px >= x && px < x + w && py >= y && py < y + h;
        self.fill_shape((x, y, x + w, y + h), color, inside);
    }

    /// Fill the axis-aligned ellipse centred at `cx`, `cy` with radii `rx`, `ry`.
    pub fn fill_ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64, color: Rgba) {
        if rx <= 0.0 || ry <= 0.0 {
            self.fill_shape((0.0, 0.0, 0.0, 0.0), color, |_, _| false);
            return;
        }
        let inside = |px: f64, py: f64| {
            let nx = (px - cx) / rx;
            let ny = (py - cy) / ry;
            nx * nx + ny * ny <= 1.0
        };
        self.fill_shape((cx - rx, cy - ry, cx + rx, cy + ry), color, inside);
    }

    fn fill_shape(
        &mut self,
        bounds: (f64, f64, f64, f64),
        color: Rgba,
        inside: impl Fn(f64, f64) -> bool,
    ) {
        match self.composite {
            CompositeOp::SourceOver => {
                let (x0, y0, x1, y1) = self.pixel_span(bounds);
                for py in y0..y1 {
                    for px in x0..x1 {
                        if inside(px as f64 + 0.5, py as f64 + 0.5) {
                            self.blend_over(px, py, color);
                        }
                    }
                }
            }
            CompositeOp::DestinationIn => {
                for py in 0..self.height {
                    for px in 0..self.width {
                        let keep = if inside(px as f64 + 0.5, py as f64 + 0.5) {
                            color.a
                        } else {
                            0
                        };
                        self.scale_alpha(px, py, keep);
                    }
                }
            }
        }
    }

    /// Pixel index range whose centres may fall inside `bounds`.
    fn pixel_span(&self, (x0, y0, x1, y1): (f64, f64, f64, f64)) -> (usize, usize, usize, usize) {
        let clamp = |v: f64, max: usize| v.max(0.0).min(max as f64) as usize;
        (
            clamp(x0.floor(), self.width),
            clamp(y0.floor(), self.height),
            clamp(x1.ceil(), self.width),
            clamp(y1.ceil(), self.height),
        )
    }

    fn blend_over(&mut self, x: usize, y: usize, src: Rgba) {
        let i = (y * self.width + x) * 4;
        if src.a == 255 {
            self.pixels[i..i + 4].copy_from_slice(&[src.r, src.g, src.b, 255]);
            return;
        }
        if src.a == 0 {
            return;
        }

        let sa = f64::from(src.a) / 255.0;
        let da = f64::from(self.pixels[i + 3]) / 255.0;
        let out_a = sa + da * (1.0 - sa);
        for (offset, sc) in [src.r, src.g, src.b].into_iter().enumerate() {
            let dc = f64::from(self.pixels[i + offset]);
            let blended = (f64::from(sc) * sa + dc * da * (1.0 - sa)) / out_a;
            self.pixels[i + offset] = blended.round().clamp(0.0, 255.0) as u8;
        }
        self.pixels[i + 3] = (out_a * 255.0).round() as u8;
    }

    fn scale_alpha(&mut self, x: usize, y: usize, alpha: u8) {
        let i = (y * self.width + x) * 4;
        let scaled = u16::from(self.pixels[i + 3]) * u16::from(alpha) / 255;
        if scaled == 0 {
            self.pixels[i..i + 4].fill(0);
        } else {
            self.pixels[i + 3] = scaled as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba = Rgba::opaque(255, 0, 0);

    #[test]
    fn test_canvas_rejects_zero_size() {
        assert!(Canvas::new(0, 10).is_err());
        assert!(Canvas::new(10, 0).is_err());
        let canvas = Canvas::new(4, 3).unwrap();
        assert_eq!(canvas.as_rgba().len(), 48);
        assert_eq!(canvas.pixel(0, 0), Some(Rgba::TRANSPARENT));
        assert_eq!(canvas.pixel(4, 0), None);
    }

    #[test]
    fn test_fill_rect_covers_pixel_centres() {
        let mut canvas = Canvas::new(10, 10).unwrap();
        canvas.fill_rect(2.0, 3.0, 5.0, 5.0, RED);
        assert_eq!(canvas.pixel(2, 3), Some(RED));
        assert_eq!(canvas.pixel(6, 7), Some(RED));
        assert_eq!(canvas.pixel(7, 7), Some(Rgba::TRANSPARENT));
        assert_eq!(canvas.pixel(1, 3), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn test_adjacent_fractional_rects_tile_without_gaps() {
        let mut canvas = Canvas::new(10, 1).unwrap();
        let scale = 10.0 / 3.0;
        for i in 0..3 {
            canvas.fill_rect(i as f64 * scale, 0.0, scale, 1.0, RED);
        }
        assert!((0..10).all(|x| canvas.pixel(x, 0) == Some(RED)));
    }

    #[test]
    fn test_destination_in_ellipse_masks_corners() {
        let mut canvas = Canvas::new(20, 20).unwrap();
        canvas.fill_rect(0.0, 0.0, 20.0, 20.0, RED);
        canvas.set_composite(CompositeOp::DestinationIn);
        canvas.fill_ellipse(10.0, 10.0, 9.0, 9.0, Rgba::BLACK);

        assert_eq!(canvas.pixel(10, 10), Some(RED));
        assert_eq!(canvas.pixel(0, 0), Some(Rgba::TRANSPARENT));
        assert_eq!(canvas.pixel(19, 19), Some(Rgba::TRANSPARENT));
        assert_eq!(canvas.pixel(10, 0), Some(Rgba::TRANSPARENT));
        assert_eq!(canvas.pixel(10, 1), Some(RED));
    }

    #[test]
    fn test_source_over_translucent_blend() {
        let mut canvas = Canvas::new(1, 1).unwrap();
        canvas.fill_rect(0.0, 0.0, 1.0, 1.0, Rgba::opaque(0, 0, 255));
        canvas.fill_rect(0.0, 0.0, 1.0, 1.0, Rgba::new(255, 0, 0, 128));
        let p = canvas.pixel(0, 0).unwrap();
        assert_eq!(p.a, 255);
        assert!(p.r > 120 && p.r < 135);
        assert!(p.b > 120 && p.b < 135);
    }

    #[test]
    fn test_clear_resets_pixels() {
        let mut canvas = Canvas::new(2, 2).unwrap();
        canvas.fill_rect(0.0, 0.0, 2.0, 2.0, RED);
        canvas.clear();
        assert!(canvas.as_rgba().iter().all(|&b| b == 0));
    }
}
