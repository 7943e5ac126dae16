//! # Software QR Rasterization
//!
//! QR codes are always drawn here and sent as bitmaps. Printer-native QR
//! commands (`GS ( k`) encode the payload in the active code page on many
//! firmwares, which mangles non-ASCII text; rendering the symbol ourselves
//! keeps the payload as UTF-8 bytes.
//!
//! ```text
//! border (1 module) ┐
//!                   ▼
//!                 ┌──────────┐
//!                 │ ▓▓▓ ▓ ▓▓▓│   each module = module_size × module_size dots
//!                 │ ▓ ▓  ▓▓ ▓│
//!                 │ ▓▓▓ ▓ ▓▓▓│
//!                 └──────────┘
//! ```

use qrcode::{Color, EcLevel, QrCode};

use super::Bitmap;
use crate::error::{PrintboxError, Result};

/// Quiet zone around the symbol, in modules.
pub const BORDER_MODULES: u32 = 1;

/// Render `data` (UTF-8 bytes, error correction level L) to a bitmap with
/// `module_size` dots per module.
///
/// ```
/// use printbox::render::qr;
///
/// let bitmap = qr::render("https://example.com", 3).unwrap();
/// // version 2 symbol: 25 modules + 2 border modules, 3 dots each
/// assert_eq!(bitmap.width(), 81);
/// assert_eq!(bitmap.width(), bitmap.height());
/// ```
pub fn render(data: &str, module_size: u32) -> Result<Bitmap> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L)
        .map_err(|e| PrintboxError::Qr(e.to_string()))?;

    let modules = code.width() as u32;
    let colors = code.to_colors();
    let scale = module_size.max(1);
    let side = (modules + 2 * BORDER_MODULES) * scale;

    Ok(Bitmap::from_fn(side, side, |x, y| {
        let mx = x / scale;
        let my = y / scale;
        if mx < BORDER_MODULES
            || my < BORDER_MODULES
            || mx >= modules + BORDER_MODULES
            || my >= modules + BORDER_MODULES
        {
            return false;
        }
        let index = ((my - BORDER_MODULES) * modules + (mx - BORDER_MODULES)) as usize;
        colors[index] == Color::Dark
    }))
}
