//! # Device Adapters
//!
//! The [`Device`] trait is the command-level printer API the rendering
//! engine drives. It sits between the engine (which decides *what* to print
//! and in which order) and a [`Transport`](crate::transport::Transport)
//! (which moves bytes).
//!
//! ## Implementations
//!
//! - [`EscPosDevice`]: encodes calls as ESC/POS bytes for a hardware profile
//! - [`RecordingDevice`]: records calls, for tests and dry runs
//!
//! ## Error Contract
//!
//! A call the device cannot express (a style command or cut form its
//! profile lacks) fails with [`PrintboxError::Unsupported`] *before* any byte
//! is sent. Every other error means the device or link failed.
//!
//! [`PrintboxError::Unsupported`]: crate::error::PrintboxError::Unsupported

pub mod escpos;
pub mod recording;

pub use escpos::EscPosDevice;
pub use recording::{DeviceCall, RecordingDevice};

use serde::Serialize;

use crate::error::Result;
use crate::protocol::commands::{STATUS_OFFLINE, STATUS_PAPER_END, STATUS_PAPER_NEAR_END};
use crate::protocol::text::{Alignment, Font};
use crate::render::{Bitmap, RasterImpl};

/// One style setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleCommand {
    Align(Alignment),
    Font(Font),
    Bold(bool),
    Underline(u8),
    Invert(bool),
    /// Character width and height multipliers, 1..=8
    Size { width: u8, height: u8 },
    /// Print density level, 0..=8
    Density(u8),
    Smooth(bool),
    Flip(bool),
}

/// Cutter modes for [`CutForm::Mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutMode {
    Part,
}

/// The ways a cut can be requested.
///
/// Firmwares disagree on which forms they understand, so the engine tries
/// several in order until one is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutForm {
    /// Feed to the cutter and cut partially in one command
    Partial,
    /// Explicit cutter mode after a line feed
    Mode(CutMode),
    /// The firmware's default cut
    Bare,
}

/// Roll paper sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperStatus {
    Adequate,
    NearEnd,
    Empty,
    /// No answer or no sensor
    Unknown,
}

impl PaperStatus {
    /// Decode a `DLE EOT 4` response byte.
    pub fn from_response(byte: u8) -> Self {
        if byte & STATUS_PAPER_END != 0 {
            Self::Empty
        } else if byte & STATUS_PAPER_NEAR_END != 0 {
            Self::NearEnd
        } else {
            Self::Adequate
        }
    }
}

/// Decode a `DLE EOT 1` response byte.
pub fn online_from_response(byte: u8) -> bool {
    byte & STATUS_OFFLINE == 0
}

/// Snapshot of the printer's health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrinterStatus {
    pub online: bool,
    pub paper: PaperStatus,
}

impl PrinterStatus {
    /// Reported when the printer cannot be reached at all.
    pub const UNREACHABLE: Self = Self {
        online: false,
        paper: PaperStatus::Unknown,
    };
}

/// Command-level printer API.
pub trait Device: Send {
    /// Send bytes untouched.
    fn write_raw(&mut self, data: &[u8]) -> Result<()>;

    /// Apply one style setting.
    fn set_style(&mut self, command: StyleCommand) -> Result<()>;

    /// Print text in the device code page, without a line feed.
    fn text(&mut self, text: &str) -> Result<()>;

    /// Print text followed by a line feed.
    fn line(&mut self, text: &str) -> Result<()>;

    /// Print a 1-bit bitmap with the given raster encoding.
    fn raster(&mut self, bitmap: &Bitmap, implementation: RasterImpl) -> Result<()>;

    fn cut(&mut self, form: CutForm) -> Result<()>;

    fn is_online(&mut self) -> Result<bool>;

    fn paper_status(&mut self) -> Result<PaperStatus>;
}

impl<D: Device + ?Sized> Device for Box<D> {
    fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_raw(data)
    }

    fn set_style(&mut self, command: StyleCommand) -> Result<()> {
        (**self).set_style(command)
    }

    fn text(&mut self, text: &str) -> Result<()> {
        (**self).text(text)
    }

    fn line(&mut self, text: &str) -> Result<()> {
        (**self).line(text)
    }

    fn raster(&mut self, bitmap: &Bitmap, implementation: RasterImpl) -> Result<()> {
        (**self).raster(bitmap, implementation)
    }

    fn cut(&mut self, form: CutForm) -> Result<()> {
        (**self).cut(form)
    }

    fn is_online(&mut self) -> Result<bool> {
        (**self).is_online()
    }

    fn paper_status(&mut self) -> Result<PaperStatus> {
        (**self).paper_status()
    }
}
