//! Heat-map widget.
//!
//! Draws an RGBA [`Canvas`] with half-block characters: each terminal cell
//! shows two vertically stacked pixels, the upper one as the foreground of
//! `▀` and the lower one as the background. Terminal cells are roughly twice
//! as tall as they are wide, so this keeps the canvas close to square.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::widgets::{Block, Widget};
use thermoview_core::{Canvas, Rgba};

const UPPER_HALF_BLOCK: &str = "▀";

/// Widget showing a heat-map canvas scaled to its area.
pub struct HeatmapWidget<'a> {
    canvas: Option<&'a Canvas>,
    block: Option<Block<'a>>,
}

impl<'a> HeatmapWidget<'a> {
    pub fn new(canvas: Option<&'a Canvas>) -> Self {
        Self {
            canvas,
            block: None,
        }
    }

    #[must_use]
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

/// Terminal color for a pixel. Pixels outside the mask use the default
/// background.
fn pixel_color(pixel: Option<Rgba>) -> Color {
    match pixel {
        Some(p) if p.a >= 128 => Color::Rgb(p.r, p.g, p.b),
        _ => Color::Reset,
    }
}

/// Largest area with a 1:2 cell aspect ratio, centred in `area`.
pub fn square_area(area: Rect) -> Rect {
    let width = area.width.min(area.height.saturating_mul(2));
    let height = (width / 2).max(1).min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

impl Widget for HeatmapWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.render(area, buf);
                inner
            }
            None => area,
        };

        let Some(canvas) = self.canvas else {
            return;
        };
        let target = square_area(inner);
        if target.width == 0 || target.height == 0 {
            return;
        }

        let rows = usize::from(target.height) * 2;
        let cols = usize::from(target.width);
        let sample = |col: usize, row: usize| {
            let x = col * canvas.width() / cols;
            let y = row * canvas.height() / rows;
            pixel_color(canvas.pixel(x, y))
        };

        for cy in 0..target.height {
            for cx in 0..target.width {
                let (col, row) = (usize::from(cx), usize::from(cy) * 2);
                let top = sample(col, row);
                let bottom = sample(col, row + 1);
                if let Some(cell) = buf.cell_mut((target.x + cx, target.y + cy)) {
                    cell.set_symbol(UPPER_HALF_BLOCK).set_fg(top).set_bg(bottom);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermoview_core::{RenderOptions, Renderer, ThermalGrid};

    fn rendered(grid: &ThermalGrid) -> Renderer {
        let mut renderer = Renderer::with_canvas(RenderOptions::default(), 64, 64).unwrap();
        renderer.render(grid);
        renderer
    }

    #[test]
    fn test_square_area_fits_wide_terminal() {
        let area = square_area(Rect::new(0, 0, 80, 20));
        assert_eq!(area, Rect::new(20, 0, 40, 20));
    }

    #[test]
    fn test_square_area_fits_tall_terminal() {
        let area = square_area(Rect::new(0, 0, 20, 40));
        assert_eq!(area, Rect::new(0, 15, 20, 10));
    }

    #[test]
    fn test_centre_uses_canvas_colour_and_corners_stay_blank() {
        let renderer = rendered(&ThermalGrid::uniform(20.0));
        let area = Rect::new(0, 0, 16, 8);
        let mut buf = Buffer::empty(area);
        HeatmapWidget::new(renderer.canvas()).render(area, &mut buf);

        let centre = &buf[(8, 4)];
        assert_eq!(centre.symbol(), UPPER_HALF_BLOCK);
        assert_eq!(centre.fg, Color::Rgb(0, 0, 255));
        assert_eq!(centre.bg, Color::Rgb(0, 0, 255));

        let corner = &buf[(0, 0)];
        assert_eq!(corner.fg, Color::Reset);
        assert_eq!(corner.bg, Color::Reset);
    }

    #[test]
    fn test_missing_canvas_draws_nothing() {
        let area = Rect::new(0, 0, 8, 4);
        let mut buf = Buffer::empty(area);
        HeatmapWidget::new(None).render(area, &mut buf);
        assert_eq!(buf, Buffer::empty(area));
    }
}
