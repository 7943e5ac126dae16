//! Call-recording device
//!
//! Records every [`Device`] call instead of printing. Tests use it to check
//! the order of engine operations; the CLI uses it for `--dry-run`.
//!
//! Like [`MockTransport`](crate::transport::MockTransport), clones share the
//! recorded log.

use std::sync::{Arc, Mutex, MutexGuard};

use super::{CutForm, Device, PaperStatus, StyleCommand};
use crate::error::{PrintboxError, Result};
use crate::render::{Bitmap, RasterImpl};

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Raw(Vec<u8>),
    Style(StyleCommand),
    Text(String),
    Line(String),
    Raster {
        width: u32,
        height: u32,
        implementation: RasterImpl,
    },
    Cut(CutForm),
}

#[derive(Debug, Default)]
struct Log {
    calls: Vec<DeviceCall>,
    rejected_cuts: Vec<CutForm>,
    unsupported_styles: Vec<std::mem::Discriminant<StyleCommand>>,
    failing_writes: usize,
    fail_on_text: Option<String>,
    fail_rasters: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingDevice {
    log: Arc<Mutex<Log>>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.log().calls.clone()
    }

    pub fn clear(&self) {
        self.log().calls.clear();
    }

    /// Reject the given cut form as unsupported.
    pub fn reject_cut(&self, form: CutForm) {
        self.log().rejected_cuts.push(form);
    }

    /// Reject every style command of the same variant as `command`.
    pub fn reject_style(&self, command: StyleCommand) {
        self.log().unsupported_styles.push(std::mem::discriminant(&command));
    }

    /// Make the next `count` calls fail with a transport error.
    pub fn fail_next(&self, count: usize) {
        self.log().failing_writes = count;
    }

    /// Fail any text or line write whose content contains `needle`.
    pub fn fail_on_text(&self, needle: impl Into<String>) {
        self.log().fail_on_text = Some(needle.into());
    }

    /// Make every raster call fail with a transport error.
    pub fn fail_rasters(&self, fail: bool) {
        self.log().fail_rasters = fail;
    }

    fn record(&self, call: DeviceCall) -> Result<()> {
        let mut log = self.log();
        if log.failing_writes > 0 {
            log.failing_writes -= 1;
            return Err(PrintboxError::Transport("recorded failure".into()));
        }
        if let (Some(needle), DeviceCall::Text(text) | DeviceCall::Line(text)) =
            (&log.fail_on_text, &call)
        {
            if text.contains(needle.as_str()) {
                return Err(PrintboxError::Transport(format!("write of {:?} failed", text)));
            }
        }
        log.calls.push(call);
        Ok(())
    }
}

impl Device for RecordingDevice {
    fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.record(DeviceCall::Raw(data.to_vec()))
    }

    fn set_style(&mut self, command: StyleCommand) -> Result<()> {
        if self.log().unsupported_styles.contains(&std::mem::discriminant(&command)) {
            return Err(PrintboxError::Unsupported(format!("{:?}", command)));
        }
        self.record(DeviceCall::Style(command))
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.record(DeviceCall::Text(text.to_string()))
    }

    fn line(&mut self, text: &str) -> Result<()> {
        self.record(DeviceCall::Line(text.to_string()))
    }

    fn raster(&mut self, bitmap: &Bitmap, implementation: RasterImpl) -> Result<()> {
        if self.log().fail_rasters {
            return Err(PrintboxError::Transport("raster write failed".into()));
        }
        self.record(DeviceCall::Raster {
            width: bitmap.width(),
            height: bitmap.height(),
            implementation,
        })
    }

    fn cut(&mut self, form: CutForm) -> Result<()> {
        if self.log().rejected_cuts.contains(&form) {
            return Err(PrintboxError::Unsupported(format!("cut {:?}", form)));
        }
        self.record(DeviceCall::Cut(form))
    }

    fn is_online(&mut self) -> Result<bool> {
        Ok(true)
    }

    fn paper_status(&mut self) -> Result<PaperStatus> {
        Ok(PaperStatus::Adequate)
    }
}
