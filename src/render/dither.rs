//! # Dithering
//!
//! Converts grayscale images to 1-bit bitmaps for the print head.
//!
//! ## Algorithms
//!
//! | Method | Speed | Quality | Artifacts |
//! |--------|-------|---------|-----------|
//! | Floyd-Steinberg | Slow | Better | Noise, worms |
//! | Bayer | Fast | Good | Regular pattern |
//! | Threshold | Fastest | Poor | Banding |
//!
//! Floyd-Steinberg (error diffusion) is the default for photos: it keeps
//! detail in faces and text. Bayer ordered dithering is deterministic per
//! pixel and prints a regular halftone screen, which some thermal heads
//! reproduce more evenly. Threshold is used when dithering is disabled.
//!
//! ## The Bayer Matrix
//!
//! ```text
//!     0   1   2   3   4   5   6   7   (x mod 8)
//!   ┌───┬───┬───┬───┬───┬───┬───┬───┐
//! 0 │ 0 │32 │ 8 │40 │ 2 │34 │10 │42 │
//! 1 │48 │16 │56 │24 │50 │18 │58 │26 │
//! 2 │12 │44 │ 4 │36 │14 │46 │ 6 │38 │
//! 3 │60 │28 │52 │20 │62 │30 │54 │22 │
//! 4 │ 3 │35 │11 │43 │ 1 │33 │ 9 │41 │
//! 5 │51 │19 │59 │27 │49 │17 │57 │25 │
//! 6 │15 │47 │ 7 │39 │13 │45 │ 5 │37 │
//! 7 │63 │31 │55 │23 │61 │29 │53 │21 │
//!   └───┴───┴───┴───┴───┴───┴───┴───┘
//! (y mod 8)
//! ```
//!
//! Values are normalized to (0, 1) with `threshold = (value + 0.5) / 64.0`.
//!
//! ## Usage Example
//!
//! ```
//! use image::{GrayImage, Luma};
//! use printbox::render::dither::{self, DitheringAlgorithm};
//!
//! let gray = GrayImage::from_pixel(16, 4, Luma([0]));
//! let bitmap = dither::dither(&gray, DitheringAlgorithm::FloydSteinberg);
//! assert_eq!(bitmap.data(), &[0xFF; 8]);
//!
//! let row = vec![true, true, false, false, true, false, true, false];
//! assert_eq!(dither::pack_row(&row), vec![0b11001010]);
//! ```

use image::GrayImage;
use image::imageops::BiLevel;
use serde::{Deserialize, Serialize};

use super::Bitmap;

/// Dithering algorithm for continuous-tone images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DitheringAlgorithm {
    /// Error diffusion
    #[default]
    FloydSteinberg,
    /// Bayer 8x8 ordered dithering
    Bayer,
}

/// Luma cutoff when dithering is disabled: darker pixels print.
pub const THRESHOLD: u8 = 128;

/// Bayer 8x8 dithering matrix
pub const BAYER8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// Get the Bayer threshold for a pixel position, in (0, 1).
#[inline]
pub fn threshold(x: usize, y: usize) -> f32 {
    let matrix_value = BAYER8[y & 7][x & 7];
    (matrix_value as f32 + 0.5) / 64.0
}

/// Determine if a dot should be printed at the given position.
///
/// `intensity` is 0.0 for white and 1.0 for black.
///
/// ```
/// use printbox::render::dither::should_print;
///
/// assert!(should_print(0, 0, 1.0));
/// assert!(!should_print(0, 0, 0.0));
/// ```
#[inline]
pub fn should_print(x: usize, y: usize, intensity: f32) -> bool {
    intensity > threshold(x, y)
}

/// Pack a row of boolean pixel values into bytes.
///
/// Bit 7 (MSB) is the leftmost pixel, 1 = black. A partial last byte is
/// padded with white.
///
/// ```
/// use printbox::render::dither::pack_row;
///
/// let row = vec![true; 12];
/// assert_eq!(pack_row(&row), vec![0xFF, 0xF0]);
/// ```
pub fn pack_row(pixels: &[bool]) -> Vec<u8> {
    let num_bytes = pixels.len().div_ceil(8);
    let mut bytes = vec![0u8; num_bytes];

    for (i, &pixel) in pixels.iter().enumerate() {
        if pixel {
            bytes[i / 8] |= 0x80 >> (i % 8);
        }
    }

    bytes
}

#[inline]
fn intensity(luma: u8) -> f32 {
    1.0 - luma as f32 / 255.0
}

/// Dither a grayscale image to a bitmap.
pub fn dither(gray: &GrayImage, algorithm: DitheringAlgorithm) -> Bitmap {
    match algorithm {
        DitheringAlgorithm::FloydSteinberg => {
            let mut diffused = gray.clone();
            image::imageops::dither(&mut diffused, &BiLevel);
            // BiLevel leaves only 0 and 255
            Bitmap::from_fn(gray.width(), gray.height(), |x, y| {
                diffused.get_pixel(x, y).0[0] < THRESHOLD
            })
        }
        DitheringAlgorithm::Bayer => Bitmap::from_fn(gray.width(), gray.height(), |x, y| {
            should_print(x as usize, y as usize, intensity(gray.get_pixel(x, y).0[0]))
        }),
    }
}

/// Convert without dithering: pixels darker than [`THRESHOLD`] print.
pub fn threshold_bitmap(gray: &GrayImage) -> Bitmap {
    Bitmap::from_fn(gray.width(), gray.height(), |x, y| {
        gray.get_pixel(x, y).0[0] < THRESHOLD
    })
}

// ============================================================================
// TESTS
// ============================================================================
