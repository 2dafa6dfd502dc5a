//! Error types for payload parsing in thermoview-types.

use thiserror::Error;

/// Errors that can occur when decoding thermal sensor payloads.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in thermoview-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The payload could not be interpreted at all.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A grid payload carried the wrong number of values.
    #[error("Expected {expected} values, got {actual}")]
    WrongValueCount {
        /// Number of values a full grid requires.
        expected: usize,
        /// Number of values the payload carried.
        actual: usize,
    },
}

/// Result type alias using thermoview-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
