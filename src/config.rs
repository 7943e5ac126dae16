//! # Configuration
//!
//! Runtime settings for the device, the baseline text style, headers, QR
//! codes, images and retries. Every field has a default, so an empty JSON
//! object is a valid configuration:
//!
//! ```
//! use printbox::config::Config;
//!
//! let config: Config = serde_json::from_str("{}").unwrap();
//! assert_eq!(config.device.baud_rate, 9600);
//! assert_eq!(config.codepage.id, 6);
//! assert_eq!(config.qr.module_size, 3);
//! ```
//!
//! Partial files override only what they name:
//!
//! ```json
//! {
//!   "device": { "path": "/dev/ttyUSB0", "profile": "csn-a2" },
//!   "image": { "dither": "bayer", "contrast": 1.2 }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::encoding::Codepage;
use crate::error::{PrintboxError, Result};
use crate::printer::PrinterConfig;
use crate::protocol::text::{Alignment, Font, MAX_DENSITY};
use crate::render::RasterImpl;
use crate::render::dither::DitheringAlgorithm;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub codepage: CodepageConfig,
    pub style: BaselineStyle,
    pub header: HeaderConfig,
    pub qr: QrConfig,
    pub image: ImageConfig,
    pub retry: RetryConfig,
    /// Turn rich-text spans into styled segments. When off, producers send
    /// the plain text only.
    pub formatting: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            codepage: CodepageConfig::default(),
            style: BaselineStyle::default(),
            header: HeaderConfig::default(),
            qr: QrConfig::default(),
            image: ImageConfig::default(),
            retry: RetryConfig::default(),
            formatting: true,
        }
    }
}

impl Config {
    /// Load a JSON configuration file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| PrintboxError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.profile()?;
        self.codepage.encoder()?;

        if self.style.density > MAX_DENSITY
            || self.qr.density > MAX_DENSITY
            || self.image.density > MAX_DENSITY
        {
            return Err(PrintboxError::Config(format!(
                "density must be between 0 and {}",
                MAX_DENSITY
            )));
        }
        if !(1..=8).contains(&self.style.width) || !(1..=8).contains(&self.style.height) {
            return Err(PrintboxError::Config(
                "text width and height must be between 1 and 8".into(),
            ));
        }
        if self.qr.module_size == 0 {
            return Err(PrintboxError::Config("qr.module_size must be at least 1".into()));
        }
        if self.image.fragment_height == 0 {
            return Err(PrintboxError::Config(
                "image.fragment_height must be at least 1".into(),
            ));
        }
        if self.image.width == Some(0) {
            return Err(PrintboxError::Config("image.width must be at least 1".into()));
        }
        if self.image_width()? > self.profile()?.width_dots as u32 {
            return Err(PrintboxError::Config(format!(
                "image.width exceeds the {} dot print width",
                self.profile()?.width_dots
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(PrintboxError::Config("retry.max_attempts must be at least 1".into()));
        }
        Ok(())
    }

    /// Hardware profile named by `device.profile`.
    pub fn profile(&self) -> Result<PrinterConfig> {
        PrinterConfig::by_name(&self.device.profile).ok_or_else(|| {
            PrintboxError::Config(format!("unknown printer profile '{}'", self.device.profile))
        })
    }

    /// Image width in dots: the configured width, else the profile's full width.
    pub fn image_width(&self) -> Result<u32> {
        match self.image.width {
            Some(width) => Ok(width as u32),
            None => Ok(self.profile()?.width_dots as u32),
        }
    }
}

// ============================================================================
// DEVICE
// ============================================================================

/// Serial parity setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Parity {
    #[default]
    #[serde(rename = "N")]
    None,
    #[serde(rename = "E")]
    Even,
    #[serde(rename = "O")]
    Odd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial device node
    pub path: PathBuf,
    pub baud_rate: u32,
    /// Hardware profile name, see [`PrinterConfig::by_name`]
    pub profile: String,
    /// Print into memory instead of opening the serial port
    pub mock: bool,
    pub bytesize: u8,
    pub parity: Parity,
    pub stopbits: u8,
    /// Read timeout for status queries
    pub timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/serial0"),
            baud_rate: 9600,
            profile: "rp326".into(),
            mock: false,
            bytesize: 8,
            parity: Parity::None,
            stopbits: 1,
            timeout_ms: 1000,
        }
    }
}

impl DeviceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ============================================================================
// CODE PAGE
// ============================================================================

/// Code page selection: the `ESC t n` table id and the matching text encoding.
///
/// The two must agree; on the CSN-A2 table 6 is CP1251.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodepageConfig {
    pub id: u8,
    pub encoding: String,
}

impl Default for CodepageConfig {
    fn default() -> Self {
        Self {
            id: 6,
            encoding: "cp1251".into(),
        }
    }
}

impl CodepageConfig {
    pub fn encoder(&self) -> Result<Codepage> {
        Codepage::for_label(&self.encoding)
    }
}

// ============================================================================
// BASELINE STYLE
// ============================================================================

/// The style every segment returns to and every task starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineStyle {
    pub font: Font,
    pub align: Alignment,
    pub underline: u8,
    pub invert: bool,
    pub width: u8,
    pub height: u8,
    pub density: u8,
    pub smooth: bool,
    pub flip: bool,
}

impl Default for BaselineStyle {
    fn default() -> Self {
        Self {
            font: Font::A,
            align: Alignment::Left,
            underline: 0,
            invert: false,
            width: 1,
            height: 1,
            density: 4,
            smooth: false,
            flip: false,
        }
    }
}

// ============================================================================
// HEADER
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    pub enabled: bool,
    /// Header line and rule width in font B characters
    pub width: usize,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 42,
        }
    }
}

// ============================================================================
// QR
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QrConfig {
    /// Dots per QR module
    pub module_size: u32,
    pub align: Alignment,
    pub density: u8,
    /// Center the code horizontally in the bitmap itself, independent of
    /// the printer's justification
    pub center: bool,
    pub raster: RasterImpl,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            module_size: 3,
            align: Alignment::Center,
            density: 3,
            center: false,
            raster: RasterImpl::BitImageColumn,
        }
    }
}

// ============================================================================
// IMAGE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Target width in dots; the profile width when absent
    pub width: Option<u16>,
    pub density: u8,
    pub raster: RasterImpl,
    /// Master switch for the enhancement steps below
    pub enhance: bool,
    pub grayscale: bool,
    pub contrast: f32,
    pub sharpness: f32,
    pub brightness: f32,
    pub dithering: bool,
    pub dither: DitheringAlgorithm,
    /// Maximum rows per raster command
    pub fragment_height: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            width: None,
            density: 4,
            raster: RasterImpl::BitImageRaster,
            enhance: true,
            grayscale: true,
            contrast: 1.5,
            sharpness: 1.3,
            brightness: 1.0,
            dithering: true,
            dither: DitheringAlgorithm::FloydSteinberg,
            fragment_height: 960,
        }
    }
}

// ============================================================================
// RETRY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 500,
        }
    }
}
