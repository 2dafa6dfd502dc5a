//! Platform-agnostic types for the thermoview thermal camera client.
//!
//! This crate holds everything that does not touch Bluetooth directly, so it
//! can be shared by the native BLE stack (thermoview-core) and any front-end.
//!
//! # Features
//!
//! - [`ThermalGrid`]: the 8x8 temperature grid with its 64-value invariant
//! - Payload decoding for the raw-grid and scalar characteristics
//! - UUID constants for the thermal service and its characteristics
//! - Error types for payload parsing
//!
//! # Example
//!
//! ```
//! use thermoview_types::{ThermalGrid, payload};
//!
//! let text = vec!["24.0"; 64].join(",");
//! let grid = ThermalGrid::from_payload(text.as_bytes()).unwrap();
//! assert_eq!(grid.min_max(), Some((24.0, 24.0)));
//!
//! assert_eq!(payload::parse_scalar_payload(b"23.5"), 23.5);
//! ```

pub mod error;
pub mod payload;
pub mod types;
pub mod uuid;

pub use error::{ParseError, ParseResult};
pub use types::{GRID_CELLS, GRID_SIZE, SessionState, ThermalGrid, ThermalUpdate};
pub use uuid as uuids;
