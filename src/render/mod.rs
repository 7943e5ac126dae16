//! # Rendering Module
//!
//! Turns [`PrintTask`](crate::task::PrintTask)s into device calls.
//!
//! ## Modules
//!
//! - [`engine`]: the task state machine and persistent printer state
//! - [`artwork`]: device-free preparation of QR symbols and photos
//! - [`image`]: photo preparation (orient, resize, enhance, dither)
//! - [`qr`]: software QR rasterization
//! - [`dither`]: grayscale to 1-bit conversion
//!
//! ## Bitmaps
//!
//! Everything graphical ends up as a [`Bitmap`]: packed rows, MSB = leftmost
//! dot, 1 = black. The device chooses how to encode it according to a
//! [`RasterImpl`].

pub mod artwork;
pub mod dither;
pub mod engine;
pub mod image;
pub mod qr;

pub use artwork::{Artwork, Rasterizer};
pub use engine::{DeviceMode, PrinterState, RenderingEngine};

use serde::{Deserialize, Serialize};

use crate::protocol::text::Alignment;

/// Raster encodings, see [`crate::protocol::graphics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterImpl {
    /// `GS v 0`
    #[default]
    BitImageRaster,
    /// `GS ( L` store and print
    Graphics,
    /// `ESC *` 24-dot column stripes
    BitImageColumn,
}

/// A 1-bit image, packed row by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// An all-white bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        let width_bytes = width.div_ceil(8) as usize;
        Self {
            width,
            height,
            data: vec![0; width_bytes * height as usize],
        }
    }

    /// Build a bitmap from a per-pixel predicate (true = black).
    pub fn from_fn<F>(width: u32, height: u32, mut is_black: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut data = Vec::with_capacity(width.div_ceil(8) as usize * height as usize);
        let mut row = Vec::with_capacity(width as usize);
        for y in 0..height {
            row.clear();
            row.extend((0..width).map(|x| is_black(x, y)));
            data.extend(dither::pack_row(&row));
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width_bytes(&self) -> usize {
        self.width.div_ceil(8) as usize
    }

    /// Packed rows, `width_bytes() * height()` bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let byte = self.data[y as usize * self.width_bytes() + x as usize / 8];
        byte & (0x80 >> (x % 8)) != 0
    }

    /// Split into horizontal bands of at most `max_rows` rows.
    pub fn fragments(&self, max_rows: u32) -> Vec<Bitmap> {
        let max_rows = max_rows.max(1);
        let row_bytes = self.width_bytes();
        (0..self.height)
            .step_by(max_rows as usize)
            .map(|top| {
                let rows = max_rows.min(self.height - top);
                let start = top as usize * row_bytes;
                let end = start + rows as usize * row_bytes;
                Bitmap {
                    width: self.width,
                    height: rows,
                    data: self.data[start..end].to_vec(),
                }
            })
            .collect()
    }

    /// Place the bitmap on a wider white canvas. Narrower targets return a copy.
    pub fn placed(&self, canvas_width: u32, alignment: Alignment) -> Bitmap {
        if canvas_width <= self.width {
            return self.clone();
        }
        let offset = match alignment {
            Alignment::Left => 0,
            Alignment::Center => (canvas_width - self.width) / 2,
            Alignment::Right => canvas_width - self.width,
        };
        Bitmap::from_fn(canvas_width, self.height, |x, y| {
            x >= offset && self.get(x - offset, y)
        })
    }
}
