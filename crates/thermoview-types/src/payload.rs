//! Decoding of the text payloads carried by the thermal characteristics.
//!
//! The firmware writes plain ASCII: the raw-grid characteristic carries 64
//! comma-separated numbers, the average and max characteristics carry a
//! single number each. Payloads are decoded leniently. Invalid UTF-8 is
//! replaced, unparsable grid tokens become NaN and scalar payloads are read
//! up to the first character that cannot continue a number.

use std::borrow::Cow;

use crate::error::{ParseError, ParseResult};
use crate::types::{GRID_CELLS, ThermalGrid};

/// Separator between grid values.
pub const GRID_DELIMITER: char = ',';

/// Decode a notification payload as text.
///
/// Trailing NUL bytes (common with C-string firmware buffers) are dropped.
pub fn decode_text(payload: &[u8]) -> Cow<'_, str> {
    let end = payload
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |last| last + 1);
    String::from_utf8_lossy(&payload[..end])
}

/// Convert a single grid token to a number.
///
/// Surrounding whitespace is ignored and an empty token reads as `0.0`.
/// Anything that is not a plain decimal or `Infinity` literal yields NaN.
///
/// # Examples
///
/// ```
/// use thermoview_types::payload::parse_token;
///
/// assert_eq!(parse_token(" 21.25 "), 21.25);
/// assert_eq!(parse_token(""), 0.0);
/// assert!(parse_token("abc").is_nan());
/// ```
pub fn parse_token(token: &str) -> f64 {
    let token = token.trim();
    if token.is_empty() {
        return 0.0;
    }

    match token {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    // `f64::from_str` also accepts "inf" and "nan" spellings; the firmware
    // never sends those, so only digits, signs, dots and exponents pass.
    let plain = token
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !plain {
        return f64::NAN;
    }

    token.parse().unwrap_or(f64::NAN)
}

/// Parse the longest leading floating-point number in `text`.
///
/// Leading whitespace is skipped. Returns NaN when no number starts the text.
///
/// # Examples
///
/// ```
/// use thermoview_types::payload::parse_leading_float;
///
/// assert_eq!(parse_leading_float("23.5"), 23.5);
/// assert_eq!(parse_leading_float("  41.0 C"), 41.0);
/// assert_eq!(parse_leading_float("1e2x"), 100.0);
/// assert!(parse_leading_float("warming up").is_nan());
/// ```
pub fn parse_leading_float(text: &str) -> f64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut pos = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        pos += 1;
    }

    if text[pos..].starts_with("Infinity") {
        return if bytes[0] == b'-' {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_start = pos;
    while bytes.get(pos).is_some_and(u8::is_ascii_digit) {
        pos += 1;
    }
    let mut digits = pos - int_start;

    if bytes.get(pos) == Some(&b'.') {
        let frac_start = pos + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            pos = frac_end;
        }
    }

    if digits == 0 {
        return f64::NAN;
    }

    // Exponent only counts when at least one digit follows it.
    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        let mut exp_end = pos + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            pos = exp_end;
        }
    }

    text[..pos].parse().unwrap_or(f64::NAN)
}

/// Parse a raw-grid payload into a [`ThermalGrid`].
///
/// # Errors
///
/// Returns [`ParseError::WrongValueCount`] unless the payload splits into
/// exactly 64 tokens, and [`ParseError::InvalidData`] for an empty payload.
///
/// # Examples
///
/// ```
/// use thermoview_types::payload::parse_grid_payload;
///
/// let text = vec!["22.5"; 64].join(",");
/// let grid = parse_grid_payload(text.as_bytes()).unwrap();
/// assert_eq!(grid.get(7, 7), 22.5);
///
/// let short = vec!["22.5"; 63].join(",");
/// assert!(parse_grid_payload(short.as_bytes()).is_err());
/// ```
pub fn parse_grid_payload(payload: &[u8]) -> ParseResult<ThermalGrid> {
    let text = decode_text(payload);
    if text.trim().is_empty() {
        return Err(ParseError::InvalidData("empty grid payload".to_string()));
    }

    let values: Vec<f64> = text.split(GRID_DELIMITER).map(parse_token).collect();
    if values.len() != GRID_CELLS {
        return Err(ParseError::WrongValueCount {
            expected: GRID_CELLS,
            actual: values.len(),
        });
    }
    ThermalGrid::from_values(&values)
}

/// Parse an average or max temperature payload.
///
/// Never fails: text without a leading number yields NaN.
pub fn parse_scalar_payload(payload: &[u8]) -> f64 {
    parse_leading_float(&decode_text(payload))
}
