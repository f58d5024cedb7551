//! Size String Parsing
//!
//! Converts human-readable sizes such as `"1.2GB"` or `"500b"` to byte counts.

use crate::error::{CacheError, Result};

// Two-letter units come before "B" so "KB" is never read as "B" plus a stray "K".
const UNITS: [(&str, i64); 5] = [
    ("TB", 1 << 40),
    ("KB", 1 << 10),
    ("MB", 1 << 20),
    ("GB", 1 << 30),
    ("B", 1),
];

/// Parses a size string of the form `<number><unit>` into bytes.
///
/// The unit is one of `B`, `KB`, `MB`, `GB`, `TB` (case-insensitive). The
/// number may be fractional or negative; the result is truncated toward zero
/// after multiplying by the unit.
///
/// # Errors
/// - `InvalidUnit` if the string does not end in a known unit
/// - `MalformedNumber` if the part before the unit is not a finite number
pub fn parse_size_string(size: &str) -> Result<i64> {
    let upper = size.to_ascii_uppercase();

    let (number, multiplier) = UNITS
        .iter()
        .find_map(|(unit, bytes)| upper.strip_suffix(unit).map(|rest| (rest, *bytes)))
        .ok_or_else(|| CacheError::InvalidUnit(size.to_string()))?;

    let magnitude: f64 = number
        .parse()
        .map_err(|_| CacheError::MalformedNumber(size.to_string()))?;

    if !magnitude.is_finite() {
        return Err(CacheError::MalformedNumber(size.to_string()));
    }

    Ok((magnitude * multiplier as f64) as i64)
}
