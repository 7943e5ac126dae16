//! # ESC/POS Protocol Implementation
//!
//! This module provides low-level command builders for the ESC/POS protocol
//! spoken by serial thermal receipt printers.
//!
//! ## Module Structure
//!
//! - [`commands`]: Initialization, code page, cutting, real-time status
//! - [`text`]: Text styling (alignment, fonts, bold, underline, size, density)
//! - [`graphics`]: Raster, graphics-buffer and column bit images
//!
//! ## Usage Example
//!
//! ```
//! use printbox::protocol::{commands, graphics, text};
//!
//! let mut data = Vec::new();
//!
//! // Start a session: initialize and select code page 6 (CP1251 on CSN-A2)
//! data.extend(commands::reinitialize(6));
//!
//! data.extend(text::bold(true));
//! data.extend(b"RECEIPT\n");
//! data.extend(text::bold(false));
//!
//! // A 384-dot wide, 8-row image
//! data.extend(graphics::raster(384, 8, &vec![0xAA; 48 * 8]));
//!
//! // Graphics leave the printer in an unknown state: reinitialize before text
//! data.extend(commands::reinitialize(6));
//! data.extend(commands::cut_partial());
//! ```

pub mod commands;
pub mod graphics;
pub mod text;
