//! # Speedwire Frame Utilities
//!
//! Byte-level helpers shared by the decoder and the frame builder: locating a
//! marker by linear search and reading the fixed-width big-endian value that
//! follows it.
//!
//! Marker positions differ between firmware versions and frame variants, so
//! fields are always located by searching rather than by fixed offsets.

use super::common::ValueWidth;

/// Returns the index of the first occurrence of `marker` at or after `from`.
///
/// # Parameters
///
/// * `buffer`: The datagram to search.
/// * `marker`: The byte pattern to look for. An empty pattern never matches.
/// * `from`: Index at which the search starts.
///
/// # Returns
///
/// The start index of the match, or `None` when the pattern does not occur.
pub fn find_marker(buffer: &[u8], marker: &[u8], from: usize) -> Option<usize> {
    if marker.is_empty() || from >= buffer.len() {
        return None;
    }
    buffer[from..]
        .windows(marker.len())
        .position(|window| window == marker)
        .map(|pos| pos + from)
}

/// Reads a big-endian unsigned integer of `width` bytes starting at `offset`.
///
/// Returns `None` when the value would run past the end of the buffer.
pub fn read_be(buffer: &[u8], offset: usize, width: ValueWidth) -> Option<u64> {
    let end = offset.checked_add(width.len())?;
    let bytes = buffer.get(offset..end)?;
    match width {
        ValueWidth::U32 => bytes.try_into().ok().map(|b| u32::from_be_bytes(b) as u64),
        ValueWidth::U64 => bytes.try_into().ok().map(u64::from_be_bytes),
    }
}

/// Finds `marker` and reads the value immediately following it.
///
/// The outer `Option` reports whether the marker exists, the inner one
/// whether the value fits inside the buffer.
pub fn value_after_marker(
    buffer: &[u8],
    marker: &[u8],
    from: usize,
    width: ValueWidth,
) -> Option<Option<u64>> {
    let pos = find_marker(buffer, marker, from)?;
    Some(read_be(buffer, pos + marker.len(), width))
}

/// Rounds `value` to `places` decimal places.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
