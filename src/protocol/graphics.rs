//! # ESC/POS Graphics Commands
//!
//! This module implements the three raster image encodings understood by
//! ESC/POS printers. Which one works best depends on the firmware; cheap
//! serial printers often only print column images reliably.
//!
//! ## Graphics Modes Overview
//!
//! | Mode | Command | Layout | Notes |
//! |------|---------|--------|-------|
//! | Bit image raster | GS v 0 | row-major | fastest, widely supported |
//! | Graphics | GS ( L | row-major, stored then printed | newer firmwares |
//! | Bit image column | ESC * 33 | 24-dot column stripes | most compatible |
//!
//! ## Bit Packing
//!
//! Row data is packed as bytes where each bit represents one dot:
//! - Bit 7 (MSB) = leftmost dot
//! - Bit 0 (LSB) = rightmost dot
//! - 1 = black (print), 0 = white (no print)
//!
//! ```text
//! Byte value 0xF0 = 11110000 = ████░░░░
//! Byte value 0xAA = 10101010 = █░█░█░█░
//! ```
//!
//! Column data (ESC *) is packed vertically instead: for each x, three bytes
//! cover 24 dots top to bottom, MSB first.
//!
//! Entering any of these modes leaves some printers in graphics mode; the
//! caller must reinitialize (`ESC @`) before sending text again.

use super::commands::{ESC, GS, LF, u16_le};

// ============================================================================
// BIT IMAGE RASTER (GS v 0)
// ============================================================================

/// # Print Raster Bit Image (GS v 0 m xL xH yL yH d1...dk)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | GS v 0 m xL xH yL yH d1...dk |
/// | Hex     | 1D 76 30 m xL xH yL yH d1...dk |
///
/// ## Parameters
///
/// - `m`: 0 = normal density
/// - `xL, xH`: Width in bytes, little-endian
/// - `yL, yH`: Height in dots, little-endian
/// - `d1...dk`: k = width_bytes × height bytes, row by row
///
/// ## Example
///
/// ```
/// use printbox::protocol::graphics;
///
/// let data = vec![0xAA; 48 * 10];
/// let cmd = graphics::raster(384, 10, &data);
///
/// assert_eq!(&cmd[0..8], &[0x1D, 0x76, 0x30, 0, 48, 0, 10, 0]);
/// assert_eq!(cmd.len(), 8 + 48 * 10);
/// ```
pub fn raster(width_dots: u16, height: u16, data: &[u8]) -> Vec<u8> {
    let width_bytes = width_dots.div_ceil(8);
    debug_assert_eq!(
        data.len(),
        width_bytes as usize * height as usize,
        "raster data length mismatch"
    );

    let [xl, xh] = u16_le(width_bytes);
    let [yl, yh] = u16_le(height);

    let mut cmd = Vec::with_capacity(8 + data.len());
    cmd.extend_from_slice(&[GS, b'v', b'0', 0, xl, xh, yl, yh]);
    cmd.extend_from_slice(data);
    cmd
}

// ============================================================================
// GRAPHICS (GS ( L)
// ============================================================================

/// Largest payload a single `GS ( L` store command can carry.
pub const GRAPHICS_MAX_PAYLOAD: usize = u16::MAX as usize - 10;

/// # Store Raster Graphics in the Print Buffer (GS ( L fn=112)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | GS ( L pL pH 0 p 0 1 1 1 xL xH yL yH d1...dk |
/// | Hex     | 1D 28 4C pL pH 30 70 30 01 01 31 xL xH yL yH d1...dk |
///
/// - `pL, pH`: payload length = k + 10
/// - `a = 48`: monochrome, `bx = by = 1`: no scaling, `c = 49`: color 1
/// - `xL, xH`: width in dots, `yL, yH`: height in dots
///
/// Follow with [`graphics_print`] to print the buffered image.
pub fn graphics_store(width_dots: u16, height: u16, data: &[u8]) -> Vec<u8> {
    debug_assert!(data.len() <= GRAPHICS_MAX_PAYLOAD, "graphics payload too large");

    let [pl, ph] = u16_le((data.len() + 10) as u16);
    let [xl, xh] = u16_le(width_dots);
    let [yl, yh] = u16_le(height);

    let mut cmd = Vec::with_capacity(15 + data.len());
    cmd.extend_from_slice(&[GS, b'(', b'L', pl, ph, 0x30, 0x70, 0x30, 1, 1, 0x31]);
    cmd.extend_from_slice(&[xl, xh, yl, yh]);
    cmd.extend_from_slice(data);
    cmd
}

/// # Print Buffered Graphics (GS ( L fn=50)
///
/// ```
/// use printbox::protocol::graphics;
///
/// assert_eq!(graphics::graphics_print(), vec![0x1D, 0x28, 0x4C, 2, 0, 0x30, 0x32]);
/// ```
#[inline]
pub fn graphics_print() -> Vec<u8> {
    vec![GS, b'(', b'L', 2, 0, 0x30, 0x32]
}

// ============================================================================
// BIT IMAGE COLUMN (ESC *)
// ============================================================================

/// Dots per column stripe in 24-dot double density mode.
pub const COLUMN_STRIPE: usize = 24;

/// # Bit Image Column Mode (ESC * 33 nL nH d1...dk)
///
/// Converts row-packed data into 24-dot stripes and prints them one line at
/// a time. Line spacing is set to 24 dots (`ESC 3 24`) so stripes abut, and
/// restored to the default (`ESC 2`) afterwards.
///
/// ```text
/// stripe 0: ESC * 33 nL nH [x0: b0 b1 b2] [x1: b0 b1 b2] ... LF
/// stripe 1: ...
/// ```
///
/// The last stripe is padded with white rows.
///
/// ## Example
///
/// ```
/// use printbox::protocol::graphics;
///
/// // 8x1 black line
/// let cmd = graphics::bit_image_column(8, 1, &[0xFF]);
/// assert_eq!(&cmd[0..3], &[0x1B, 0x33, 24]);
/// assert_eq!(&cmd[3..8], &[0x1B, 0x2A, 33, 8, 0]);
/// // Every column has its top dot set
/// assert_eq!(&cmd[8..11], &[0x80, 0x00, 0x00]);
/// ```
pub fn bit_image_column(width_dots: u16, height: u16, data: &[u8]) -> Vec<u8> {
    let width = width_dots as usize;
    let height = height as usize;
    let width_bytes = width.div_ceil(8);
    debug_assert_eq!(data.len(), width_bytes * height, "raster data length mismatch");

    let [nl, nh] = u16_le(width_dots);
    let stripes = height.div_ceil(COLUMN_STRIPE);

    let mut cmd = Vec::with_capacity(3 + stripes * (6 + width * 3) + 2);
    cmd.extend_from_slice(&[ESC, b'3', COLUMN_STRIPE as u8]);

    for stripe in 0..stripes {
        cmd.extend_from_slice(&[ESC, b'*', 33, nl, nh]);
        for x in 0..width {
            let mask = 0x80u8 >> (x % 8);
            for group in 0..3 {
                let mut byte = 0u8;
                for bit in 0..8 {
                    let y = stripe * COLUMN_STRIPE + group * 8 + bit;
                    if y < height && data[y * width_bytes + x / 8] & mask != 0 {
                        byte |= 0x80 >> bit;
                    }
                }
                cmd.push(byte);
            }
        }
        cmd.push(LF);
    }

    cmd.extend_from_slice(&[ESC, b'2']);
    cmd
}

// ============================================================================
// TESTS
// ============================================================================
