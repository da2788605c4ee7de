//! # Page Codec
//!
//! Reads and writes the two legacy page encodings.
//!
//! ## Formats
//! - **Binary**: little-endian `f32` words. A word-count prefix, a run of
//!   count-prefixed items and a trailer ending in `-9999.0`. See [`binary`].
//! - **PMX text**: one item per line with whitespace-separated numbers, `t` for
//!   text items and `@` lines for named parameters. See [`pmx`].
//!
//! ## Detection
//! A stream is binary iff its last four bytes are the little-endian encoding of
//! `-9999.0f32`; anything else is read as PMX.
//!
//! ## Example
//! ```rust
//! use scorepage::codec::{detect_format, PageFormat};
//!
//! let mut bytes = vec![0u8; 2];
//! bytes.extend_from_slice(&(-9999.0f32).to_le_bytes());
//! assert_eq!(detect_format(&bytes), PageFormat::Binary);
//! assert_eq!(detect_format(b"8 1 0 0\n"), PageFormat::Pmx);
//! ```

pub mod binary;
pub mod pmx;

pub use binary::{BinaryLayout, Trailer};
pub use pmx::PmxOptions;

/// Last word of every binary page.
pub const TERMINATOR: f32 = -9999.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    Binary,
    Pmx,
}

pub fn detect_format(bytes: &[u8]) -> PageFormat {
    match bytes.len().checked_sub(4) {
        Some(start) if bytes[start..] == TERMINATOR.to_le_bytes() => PageFormat::Binary,
        _ => PageFormat::Pmx,
    }
}

/// Decode payload bytes one byte per char so that writing them back is exact.
pub(crate) fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`latin1_decode`]; chars above U+00FF become `?`.
pub(crate) fn latin1_encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Shortest round-trip rendering; integral values print without a decimal point.
pub(crate) fn format_number(value: f32) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_streams_are_text() {
        assert_eq!(detect_format(b""), PageFormat::Pmx);
        assert_eq!(detect_format(b"abc"), PageFormat::Pmx);
    }

    #[test]
    fn test_latin1_round_trip() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        assert_eq!(latin1_encode(&latin1_decode(&bytes)), bytes);
        assert_eq!(latin1_encode("\u{2669}"), b"?");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(14.0), "14");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-3.25), "-3.25");
    }
}
