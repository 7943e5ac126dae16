//! ESC/POS device over a byte transport
//!
//! Encodes [`Device`] calls with the builders in [`crate::protocol`] and
//! checks each call against the [`PrinterConfig`] profile first, so that
//! commands a firmware does not understand are rejected instead of being
//! printed as garbage.

use tracing::{debug, instrument};

use super::{CutForm, CutMode, Device, PaperStatus, StyleCommand, online_from_response};
use crate::encoding::Codepage;
use crate::error::{PrintboxError, Result};
use crate::printer::PrinterConfig;
use crate::protocol::commands::{self, LF, StatusRequest};
use crate::protocol::{graphics, text};
use crate::render::{Bitmap, RasterImpl};
use crate::transport::Transport;

/// Lines fed before a cut so the last printed line clears the cutter.
const CUT_FEED_LINES: u8 = 3;

/// Dots fed by the combined feed-and-cut command.
const CUT_FEED_DOTS: u8 = 0;

pub struct EscPosDevice<T: Transport> {
    transport: T,
    profile: PrinterConfig,
    codepage: Codepage,
}

impl<T: Transport> EscPosDevice<T> {
    pub fn new(transport: T, profile: PrinterConfig, codepage: Codepage) -> Self {
        Self {
            transport,
            profile,
            codepage,
        }
    }

    pub fn profile(&self) -> &PrinterConfig {
        &self.profile
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn encode_style(&self, command: StyleCommand) -> Result<Vec<u8>> {
        let bytes = match command {
            StyleCommand::Align(alignment) => text::align(alignment),
            StyleCommand::Font(font) => text::font(font),
            StyleCommand::Bold(on) => text::bold(on),
            StyleCommand::Underline(level) => text::underline(level),
            StyleCommand::Invert(on) => text::invert(on),
            StyleCommand::Size { width, height } => text::size(width, height),
            StyleCommand::Density(level) => {
                if !self.profile.supports_density {
                    return Err(PrintboxError::Unsupported(format!(
                        "{} has no print density command",
                        self.profile.name
                    )));
                }
                text::density(level)
            }
            StyleCommand::Smooth(on) => text::smoothing(on),
            StyleCommand::Flip(on) => text::upside_down(on),
        };
        Ok(bytes)
    }

    fn encode_raster(&self, bitmap: &Bitmap, implementation: RasterImpl) -> Result<Vec<u8>> {
        if bitmap.width() > self.profile.width_dots as u32 {
            return Err(PrintboxError::Image(format!(
                "bitmap is {} dots wide, {} prints at most {}",
                bitmap.width(),
                self.profile.name,
                self.profile.width_dots
            )));
        }
        let width = bitmap.width() as u16;

        let mut out = Vec::with_capacity(bitmap.data().len() + 64);
        match implementation {
            RasterImpl::BitImageRaster => {
                for part in bitmap.fragments(u16::MAX as u32) {
                    out.extend(graphics::raster(width, part.height() as u16, part.data()));
                }
            }
            RasterImpl::Graphics => {
                let rows = (graphics::GRAPHICS_MAX_PAYLOAD / bitmap.width_bytes().max(1)).max(1);
                for part in bitmap.fragments(rows as u32) {
                    out.extend(graphics::graphics_store(width, part.height() as u16, part.data()));
                    out.extend(graphics::graphics_print());
                }
            }
            RasterImpl::BitImageColumn => {
                for part in bitmap.fragments(u16::MAX as u32) {
                    out.extend(graphics::bit_image_column(
                        width,
                        part.height() as u16,
                        part.data(),
                    ));
                }
            }
        }
        Ok(out)
    }

    fn query(&mut self, request: StatusRequest) -> Result<u8> {
        self.transport.query(&commands::status_request(request))
    }
}

impl<T: Transport> Device for EscPosDevice<T> {
    fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.transport.write_all(data)
    }

    fn set_style(&mut self, command: StyleCommand) -> Result<()> {
        let bytes = self.encode_style(command)?;
        self.transport.write_all(&bytes)
    }

    fn text(&mut self, text: &str) -> Result<()> {
        let bytes = self.codepage.encode(text);
        self.transport.write_all(&bytes)
    }

    fn line(&mut self, text: &str) -> Result<()> {
        let mut bytes = self.codepage.encode(text);
        bytes.push(LF);
        self.transport.write_all(&bytes)
    }

    #[instrument(skip(self, bitmap), fields(width = bitmap.width(), height = bitmap.height()))]
    fn raster(&mut self, bitmap: &Bitmap, implementation: RasterImpl) -> Result<()> {
        if bitmap.is_empty() {
            debug!("empty bitmap, nothing to print");
            return Ok(());
        }
        let bytes = self.encode_raster(bitmap, implementation)?;
        debug!(bytes = bytes.len(), "sending raster");
        self.transport.write_all(&bytes)
    }

    fn cut(&mut self, form: CutForm) -> Result<()> {
        if !self.profile.accepts_cut(form) {
            return Err(PrintboxError::Unsupported(format!(
                "{} does not accept cut form {:?}",
                self.profile.name, form
            )));
        }
        let bytes = match form {
            CutForm::Partial => commands::cut_partial_feed(CUT_FEED_DOTS),
            CutForm::Mode(CutMode::Part) => {
                let mut bytes = commands::feed_lines(CUT_FEED_LINES);
                bytes.extend(commands::cut_partial());
                bytes
            }
            CutForm::Bare => {
                let mut bytes = commands::feed_lines(CUT_FEED_LINES);
                bytes.extend(commands::cut_full());
                bytes
            }
        };
        self.transport.write_all(&bytes)
    }

    fn is_online(&mut self) -> Result<bool> {
        let byte = self.query(StatusRequest::Printer)?;
        Ok(online_from_response(byte))
    }

    fn paper_status(&mut self) -> Result<PaperStatus> {
        let byte = self.query(StatusRequest::RollPaper)?;
        Ok(PaperStatus::from_response(byte))
    }
}
