//! Core types for thermal sensor data.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

/// Number of rows (and columns) in the sensor grid.
pub const GRID_SIZE: usize = 8;

/// Number of cells in a full grid update.
pub const GRID_CELLS: usize = GRID_SIZE * GRID_SIZE;

/// An 8x8 grid of temperatures in degrees Celsius, stored row-major.
///
/// A grid always holds exactly [`GRID_CELLS`] values. Payloads with any other
/// count are rejected by [`ThermalGrid::from_values`] so a partial update can
/// never replace a complete one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThermalGrid {
    rows: [[f64; GRID_SIZE]; GRID_SIZE],
}

impl ThermalGrid {
    /// Create a grid from explicit rows.
    #[must_use]
    pub const fn new(rows: [[f64; GRID_SIZE]; GRID_SIZE]) -> Self {
        Self { rows }
    }

    /// Create a grid with every cell set to `value`.
    #[must_use]
    pub const fn uniform(value: f64) -> Self {
        Self {
            rows: [[value; GRID_SIZE]; GRID_SIZE],
        }
    }

    /// Build a grid from a flat row-major slice.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::WrongValueCount`] unless `values` holds exactly
    /// 64 entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use thermoview_types::ThermalGrid;
    ///
    /// let values: Vec<f64> = (0..64).map(f64::from).collect();
    /// let grid = ThermalGrid::from_values(&values).unwrap();
    /// assert_eq!(grid.get(1, 0), 8.0);
    ///
    /// assert!(ThermalGrid::from_values(&values[..63]).is_err());
    /// ```
    pub fn from_values(values: &[f64]) -> ParseResult<Self> {
        if values.len() != GRID_CELLS {
            return Err(ParseError::WrongValueCount {
                expected: GRID_CELLS,
                actual: values.len(),
            });
        }

        let mut rows = [[0.0; GRID_SIZE]; GRID_SIZE];
        for (row, chunk) in rows.iter_mut().zip(values.chunks_exact(GRID_SIZE)) {
            row.copy_from_slice(chunk);
        }
        Ok(Self { rows })
    }

    /// Parse a raw-grid notification payload.
    ///
    /// See [`crate::payload::parse_grid_payload`].
    pub fn from_payload(payload: &[u8]) -> ParseResult<Self> {
        crate::payload::parse_grid_payload(payload)
    }

    /// Value at `row`, `col`.
    ///
    /// # Panics
    ///
    /// Panics if either index is 8 or more.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.rows[row][col]
    }

    /// The grid rows, top to bottom.
    #[must_use]
    pub fn rows(&self) -> &[[f64; GRID_SIZE]; GRID_SIZE] {
        &self.rows
    }

    /// Iterate over all 64 values in row-major order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().flat_map(|row| row.iter().copied())
    }

    /// Minimum and maximum over all cells, ignoring NaN.
    ///
    /// Returns `None` when every cell is NaN.
    #[must_use]
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.values()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

impl fmt::Display for ThermalGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{value:6.2}")?;
            }
        }
        Ok(())
    }
}

/// Connection state of the single peripheral session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SessionState {
    /// No session, or the last connect attempt failed.
    #[default]
    Disconnected,
    /// Handshake completed and all three characteristics are subscribed.
    Connected,
}

impl SessionState {
    /// Whether the session is connected.
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, SessionState::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Connected => write!(f, "connected"),
        }
    }
}

/// One decoded notification, tagged by the characteristic it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "value", rename_all = "snake_case"))]
pub enum ThermalUpdate {
    /// A complete replacement grid.
    Grid(ThermalGrid),
    /// New average temperature.
    Average(f64),
    /// New maximum temperature.
    Maximum(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Vec<f64> {
        (0..GRID_CELLS).map(|i| i as f64).collect()
    }

    #[test]
    fn test_from_values_is_row_major() {
        let grid = ThermalGrid::from_values(&ramp()).unwrap();
        assert_eq!(grid.get(0, 0), 0.0);
        assert_eq!(grid.get(0, 7), 7.0);
        assert_eq!(grid.get(1, 0), 8.0);
        assert_eq!(grid.get(7, 7), 63.0);
    }

    #[test]
    fn test_from_values_rejects_short_and_long() {
        let short = vec![1.0; 63];
        let long = vec![1.0; 65];
        assert_eq!(
            ThermalGrid::from_values(&short),
            Err(ParseError::WrongValueCount {
                expected: 64,
                actual: 63
            })
        );
        assert_eq!(
            ThermalGrid::from_values(&long),
            Err(ParseError::WrongValueCount {
                expected: 64,
                actual: 65
            })
        );
    }

    #[test]
    fn test_default_grid_is_zero() {
        let grid = ThermalGrid::default();
        assert!(grid.values().all(|v| v == 0.0));
        assert_eq!(grid.values().count(), 64);
    }

    #[test]
    fn test_min_max() {
        let grid = ThermalGrid::from_values(&ramp()).unwrap();
        assert_eq!(grid.min_max(), Some((0.0, 63.0)));
    }

    #[test]
    fn test_min_max_ignores_nan() {
        let mut values = vec![20.0; GRID_CELLS];
        values[3] = f64::NAN;
        values[10] = 35.5;
        let grid = ThermalGrid::from_values(&values).unwrap();
        assert_eq!(grid.min_max(), Some((20.0, 35.5)));

        let all_nan = ThermalGrid::uniform(f64::NAN);
        assert_eq!(all_nan.min_max(), None);
    }

    #[test]
    fn test_display_has_eight_lines() {
        let grid = ThermalGrid::uniform(21.5);
        let text = grid.to_string();
        assert_eq!(text.lines().count(), 8);
        assert!(text.starts_with(" 21.50"));
    }

    #[test]
    fn test_session_state() {
        assert_eq!(SessionState::default(), SessionState::Disconnected);
        assert!(SessionState::Connected.is_connected());
        assert!(!SessionState::Disconnected.is_connected());
        assert_eq!(SessionState::Connected.to_string(), "connected");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_update_serialization() {
        let json = serde_json::to_string(&ThermalUpdate::Average(23.5)).unwrap();
        assert_eq!(json, r#"{"kind":"average","value":23.5}"#);

        let state = serde_json::to_string(&SessionState::Connected).unwrap();
        assert_eq!(state, r#""connected""#);
    }
}
