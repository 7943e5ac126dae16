//! # ESC/POS Text Styling Commands
//!
//! ## Text Styling Overview
//!
//! | Style | Command | Effect |
//! |-------|---------|--------|
//! | Bold | ESC E n | **Emphasized** text |
//! | Underline | ESC - n | Underlined text (1 or 2 dots) |
//! | Invert | GS B n | White on black |
//! | Size | GS ! n | 1x-8x width and height |
//! | Font | ESC M n | Font A (12x24) / Font B (9x17) |
//! | Density | GS ( K | Print head energy |
//! | Smoothing | GS b n | Smoothed outlines for enlarged text |
//! | Upside-down | ESC { n | 180 degree rotated lines |
//!
//! ## Font Selection
//!
//! | Font | Size | Columns (58mm) | Columns (80mm) |
//! |------|------|----------------|----------------|
//! | Font A | 12×24 dots | 32 chars | 48 chars |
//! | Font B | 9×17 dots | 42 chars | 64 chars |

use serde::{Deserialize, Serialize};

use super::commands::{ESC, GS};

// ============================================================================
// TEXT ALIGNMENT
// ============================================================================

/// Text alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// # Select Justification (ESC a n)
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | ASCII   | ESC a n  |
/// | Hex     | 1B 61 n  |
///
/// Takes effect at the start of the next line. Also positions raster images.
///
/// ```
/// use printbox::protocol::text::{align, Alignment};
///
/// assert_eq!(align(Alignment::Center), vec![0x1B, 0x61, 0x01]);
/// ```
pub fn align(alignment: Alignment) -> Vec<u8> {
    vec![ESC, b'a', alignment as u8]
}

// ============================================================================
// FONT SELECTION
// ============================================================================

/// Available fonts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Font {
    /// Font A: 12×24 dots
    #[default]
    A = 0,
    /// Font B: 9×17 dots, the compact font
    B = 1,
}

/// # Select Character Font (ESC M n)
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | ASCII   | ESC M n  |
/// | Hex     | 1B 4D n  |
///
/// ```
/// use printbox::protocol::text::{font, Font};
///
/// assert_eq!(font(Font::B), vec![0x1B, 0x4D, 0x01]);
/// ```
pub fn font(f: Font) -> Vec<u8> {
    vec![ESC, b'M', f as u8]
}

// ============================================================================
// EMPHASIS, UNDERLINE, INVERT
// ============================================================================

/// # Turn Emphasized Mode On/Off (ESC E n)
#[inline]
pub fn bold(enabled: bool) -> Vec<u8> {
    vec![ESC, b'E', enabled as u8]
}

/// # Underline Mode (ESC - n)
///
/// - `n = 0`: off
/// - `n = 1`: 1 dot thick
/// - `n = 2`: 2 dots thick
///
/// Values above 2 are clamped.
#[inline]
pub fn underline(level: u8) -> Vec<u8> {
    vec![ESC, b'-', level.min(2)]
}

/// # White/Black Reverse Printing (GS B n)
#[inline]
pub fn invert(enabled: bool) -> Vec<u8> {
    vec![GS, b'B', enabled as u8]
}

/// # Turn Smoothing Mode On/Off (GS b n)
///
/// Smooths the outline of enlarged characters.
#[inline]
pub fn smoothing(enabled: bool) -> Vec<u8> {
    vec![GS, b'b', enabled as u8]
}

/// # Upside-Down Print Mode (ESC { n)
///
/// Rotates characters 180 degrees. Only effective at the start of a line.
#[inline]
pub fn upside_down(enabled: bool) -> Vec<u8> {
    vec![ESC, b'{', enabled as u8]
}

// ============================================================================
// CHARACTER SIZE
// ============================================================================

/// # Select Character Size (GS ! n)
///
/// Width and height multipliers are packed into one byte:
///
/// ```text
/// bit:   7 6 5 4 | 3 2 1 0
///        width-1 | height-1
/// ```
///
/// Multipliers are clamped to 1..=8.
///
/// ```
/// use printbox::protocol::text::size;
///
/// assert_eq!(size(1, 1), vec![0x1D, 0x21, 0x00]);
/// assert_eq!(size(2, 2), vec![0x1D, 0x21, 0x11]);
/// assert_eq!(size(2, 1), vec![0x1D, 0x21, 0x10]); // double width only
/// ```
pub fn size(width: u8, height: u8) -> Vec<u8> {
    let w = width.clamp(1, 8) - 1;
    let h = height.clamp(1, 8) - 1;
    vec![GS, b'!', (w << 4) | h]
}

// ============================================================================
// PRINT DENSITY
// ============================================================================

/// Highest accepted density level. Level 4 is the printer default.
pub const MAX_DENSITY: u8 = 8;

/// # Select Print Density (GS ( K 2 0 49 m)
///
/// Levels 0..=8 map to the signed density steps -4..=+4, sent as a two's
/// complement byte. Level 4 restores the factory density.
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | GS ( K 2 0 1 m |
/// | Hex     | 1D 28 4B 02 00 31 m |
///
/// ```
/// use printbox::protocol::text::density;
///
/// assert_eq!(density(4), vec![0x1D, 0x28, 0x4B, 0x02, 0x00, 0x31, 0x00]);
/// assert_eq!(density(8), vec![0x1D, 0x28, 0x4B, 0x02, 0x00, 0x31, 0x04]);
/// assert_eq!(density(0), vec![0x1D, 0x28, 0x4B, 0x02, 0x00, 0x31, 0xFC]);
/// ```
pub fn density(level: u8) -> Vec<u8> {
    let step = level.min(MAX_DENSITY) as i8 - 4;
    vec![GS, b'(', b'K', 2, 0, 0x31, step as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align() {
        assert_eq!(align(Alignment::Left), vec![0x1B, 0x61, 0x00]);
        assert_eq!(align(Alignment::Right), vec![0x1B, 0x61, 0x02]);
    }

    #[test]
    fn test_bold_and_invert() {
        assert_eq!(bold(true), vec![0x1B, 0x45, 0x01]);
        assert_eq!(bold(false), vec![0x1B, 0x45, 0x00]);
        assert_eq!(invert(true), vec![0x1D, 0x42, 0x01]);
    }

    #[test]
    fn test_underline_clamps() {
        assert_eq!(underline(1), vec![0x1B, 0x2D, 0x01]);
        assert_eq!(underline(9), vec![0x1B, 0x2D, 0x02]);
    }

    #[test]
    fn test_smoothing_and_flip() {
        assert_eq!(smoothing(true), vec![0x1D, 0x62, 0x01]);
        assert_eq!(upside_down(false), vec![0x1B, 0x7B, 0x00]);
    }

    #[test]
    fn test_size_clamps() {
        assert_eq!(size(0, 0), vec![0x1D, 0x21, 0x00]);
        assert_eq!(size(9, 9), vec![0x1D, 0x21, 0x77]);
        assert_eq!(size(1, 2), vec![0x1D, 0x21, 0x01]);
    }

    #[test]
    fn test_density_clamps() {
        assert_eq!(density(200), density(MAX_DENSITY));
    }

    #[test]
    fn test_serde_names() {
        let font: Font = serde_json::from_str("\"b\"").unwrap();
        assert_eq!(font, Font::B);
        let align: Alignment = serde_json::from_str("\"center\"").unwrap();
        assert_eq!(align, Alignment::Center);
    }
}
