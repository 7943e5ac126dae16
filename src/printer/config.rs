//! # Printer Configuration
//!
//! This module defines hardware specifications for supported thermal printers.
//!
//! ## Supported Printers
//!
//! | Model | Paper | Width (dots) | Columns (A/B) | Density cmd |
//! |-------|-------|--------------|---------------|-------------|
//! | CSN-A2 | 58mm | 384 | 32 / 42 | no |
//! | RP326 | 80mm | 576 | 48 / 64 | yes |
//!
//! ## Usage
//!
//! ```
//! use printbox::printer::PrinterConfig;
//!
//! let config = PrinterConfig::by_name("rp326").unwrap();
//! assert_eq!(config.width_dots, 576);
//! assert_eq!(config.width_bytes, 72);
//! ```

use crate::device::CutForm;

/// # Printer Configuration
///
/// Defines the hardware characteristics of a thermal printer and the parts
/// of the ESC/POS command set its firmware accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrinterConfig {
    /// Printer model name
    pub name: &'static str,

    /// Maximum print width in dots (pixels)
    pub width_dots: u16,

    /// Print width in bytes (width_dots / 8)
    pub width_bytes: u16,

    /// Characters per line in font A
    pub columns_a: u16,

    /// Characters per line in font B
    pub columns_b: u16,

    /// Whether `GS ( K` print density is understood
    pub supports_density: bool,

    /// Cut call forms the firmware accepts
    pub cut_forms: &'static [CutForm],
}

impl PrinterConfig {
    /// # CSN-A2 Configuration
    ///
    /// 58mm TTL/serial panel printer, common in DIY builds.
    ///
    /// | Property | Value |
    /// |----------|-------|
    /// | Paper width | 58mm |
    /// | Print width | 48mm (384 dots) |
    /// | Resolution | 203 DPI |
    /// | Interface | TTL serial, 9600 baud |
    /// | Cutter | none (tear bar), cut commands only feed |
    pub const CSN_A2: Self = Self {
        name: "CSN-A2",
        width_dots: 384,
        width_bytes: 48,
        columns_a: 32,
        columns_b: 42,
        supports_density: false,
        cut_forms: &[CutForm::Bare],
    };

    /// # RP326 Configuration
    ///
    /// 80mm receipt printer with auto-cutter.
    pub const RP326: Self = Self {
        name: "RP326",
        width_dots: 576,
        width_bytes: 72,
        columns_a: 48,
        columns_b: 64,
        supports_density: true,
        cut_forms: &[
            CutForm::Partial,
            CutForm::Mode(crate::device::CutMode::Part),
            CutForm::Bare,
        ],
    };

    /// All built-in profiles.
    pub const BUILT_IN: &'static [Self] = &[Self::CSN_A2, Self::RP326];

    /// Look up a built-in profile by case-insensitive name ("csn-a2", "rp326").
    pub fn by_name(name: &str) -> Option<Self> {
        let wanted = normalize(name);
        Self::BUILT_IN
            .iter()
            .copied()
            .find(|config| normalize(config.name) == wanted)
    }

    /// Whether the firmware accepts the given cut form.
    pub fn accepts_cut(&self, form: CutForm) -> bool {
        self.cut_forms.contains(&form)
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::RP326
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
