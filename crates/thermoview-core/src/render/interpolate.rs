//! Bilinear upsampling of the 8x8 grid.

use thermoview_types::{GRID_SIZE, ThermalGrid};

const LAST_INDEX: usize = GRID_SIZE - 1;

/// Sample `grid` at fractional coordinates `gx` (column) and `gy` (row).
///
/// Coordinates are clamped to `0..=7`. The result is the bilinear blend of
/// the four surrounding cells; at the far edge the neighbour index is
/// clamped so no out-of-range cell is read.
pub fn bilinear_sample(grid: &ThermalGrid, gx: f64, gy: f64) -> f64 {
    let gx = gx.clamp(0.0, LAST_INDEX as f64);
    let gy = gy.clamp(0.0, LAST_INDEX as f64);

    let x0 = gx.floor() as usize;
    let y0 = gy.floor() as usize;
    let x1 = (x0 + 1).min(LAST_INDEX);
    let y1 = (y0 + 1).min(LAST_INDEX);
    let dx = gx - x0 as f64;
    let dy = gy - y0 as f64;

    // Same weights as v00(1-dx)(1-dy) + v10·dx(1-dy) + v01(1-dx)dy + v11·dx·dy,
    // written as nested lerps so equal neighbours reproduce their value exactly.
    let top = lerp(grid.get(y0, x0), grid.get(y0, x1), dx);
    let bottom = lerp(grid.get(y1, x0), grid.get(y1, x1), dx);
    lerp(top, bottom, dy)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    if a == b { a } else { a + (b - a) * t }
}

/// Map raster index `i` of `size` onto grid coordinates.
///
/// Index 0 lands on cell 0; index `size - 1` stops just short of cell 7.
pub fn raster_to_grid(i: usize, size: usize) -> f64 {
    i as f64 / size as f64 * LAST_INDEX as f64
}

/// A square raster of interpolated temperatures.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterFrame {
    size: usize,
    values: Vec<f64>,
}

impl RasterFrame {
    /// Upsample `grid` to `size` x `size`.
    pub fn from_grid(grid: &ThermalGrid, size: usize) -> Self {
        let mut values = Vec::with_capacity(size * size);
        for y in 0..size {
            let gy = raster_to_grid(y, size);
            for x in 0..size {
                values.push(bilinear_sample(grid, raster_to_grid(x, size), gy));
            }
        }
        Self { size, values }
    }

    /// Side length in samples.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Sample at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.values[y * self.size + x]
    }

    /// All samples, row-major.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_grid() -> ThermalGrid {
        let values: Vec<f64> = (0..64).map(f64::from).collect();
        ThermalGrid::from_values(&values).unwrap()
    }

    #[test]
    fn test_sample_at_integer_points_is_exact() {
        let grid = ramp_grid();
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                assert_eq!(
                    bilinear_sample(&grid, col as f64, row as f64),
                    grid.get(row, col)
                );
            }
        }
    }

    #[test]
    fn test_sample_at_cell_centre_is_mean_of_corners() {
        let mut rows = [[0.0; GRID_SIZE]; GRID_SIZE];
        rows[0][0] = 0.0;
        rows[0][1] = 40.0;
        rows[1][0] = 60.0;
        rows[1][1] = 100.0;
        let grid = ThermalGrid::new(rows);
        assert_eq!(bilinear_sample(&grid, 0.5, 0.5), 50.0);
    }

    #[test]
    fn test_sample_clamps_far_edge() {
        let grid = ramp_grid();
        assert_eq!(bilinear_sample(&grid, 7.0, 7.0), 63.0);
        assert_eq!(bilinear_sample(&grid, 9.0, -2.0), 7.0);
    }

    #[test]
    fn test_uniform_grid_stays_uniform() {
        let grid = ThermalGrid::uniform(23.7);
        let frame = RasterFrame::from_grid(&grid, 64);
        assert_eq!(frame.values().len(), 4096);
        assert!(frame.values().iter().all(|&v| v == 23.7));
    }

    #[test]
    fn test_raster_origin_and_extent() {
        let grid = ramp_grid();
        let frame = RasterFrame::from_grid(&grid, 64);
        assert_eq!(frame.size(), 64);
        assert_eq!(frame.get(0, 0), 0.0);

        // The last sample sits at 63/64 * 7 on both axes.
        let g = raster_to_grid(63, 64);
        assert!((g - 6.890625).abs() < 1e-12);
        let expected = bilinear_sample(&grid, g, g);
        assert_eq!(frame.get(63, 63), expected);
    }

    #[test]
    fn test_frame_stays_within_grid_range() {
        let grid = ramp_grid();
        let frame = RasterFrame::from_grid(&grid, 64);
        assert!(frame.values().iter().all(|&v| (0.0..=63.0).contains(&v)));
    }
}
