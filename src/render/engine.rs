//! # Rendering Engine
//!
//! Drives a [`Device`] through one [`PrintTask`] at a time:
//!
//! ```text
//! Idle ─► Header? ─► Body ─► [Image/QR raster] ─► Cut ─► Idle
//! ```
//!
//! ## Printer State
//!
//! The device keeps its style settings between tasks, so the engine keeps a
//! [`PrinterState`] next to it: the baseline style every task starts from and
//! whether the device was last left in graphics mode. Raster output leaves
//! many firmwares in a state where text prints wrong until `ESC @`, so any
//! task that finds the device in graphics mode reinitializes it first.
//!
//! ## Failure Handling
//!
//! Style commands the device rejects as unsupported are skipped. A cut form
//! rejected as unsupported falls through to the next form. Any other error
//! aborts the rest of the task and is returned to the caller; the next task
//! re-applies the baseline regardless.
//!
//! ## Prepare, Then Emit
//!
//! [`RenderingEngine::render`] is [`Rasterizer::prepare`] followed by
//! [`RenderingEngine::emit`]. Callers that share the engine behind a lock
//! run the first half outside it; see [`crate::queue`].

use tracing::{debug, info, instrument, warn};

use super::Bitmap;
use super::artwork::{Artwork, Rasterizer};
use super::image::Prepared;
use crate::config::{BaselineStyle, Config, HeaderConfig, ImageConfig, QrConfig};
use crate::device::{CutForm, CutMode, Device, PaperStatus, PrinterStatus, StyleCommand};
use crate::error::{PrintboxError, Result};
use crate::protocol::commands;
use crate::protocol::text::Font;
use crate::segment::{Segment, SegmentStyle};
use crate::task::{HeaderInfo, Payload, PrintTask, TextContent};

/// Cut forms in the order they are tried.
pub const CUT_FORMS: [CutForm; 3] = [
    CutForm::Partial,
    CutForm::Mode(CutMode::Part),
    CutForm::Bare,
];

/// Whether the device is ready for text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    Text,
    /// Raster output was sent; reinitialize before text
    Graphics,
}

/// Device state that persists across tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrinterState {
    pub baseline: BaselineStyle,
    pub mode: DeviceMode,
}

/// Values the engine needs from [`Config`].
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub codepage_id: u8,
    pub baseline: BaselineStyle,
    pub header: HeaderConfig,
    pub qr: QrConfig,
    pub image: ImageConfig,
    /// Image target width in dots
    pub image_width: u32,
    /// Full printable width in dots
    pub paper_width: u32,
}

impl RenderSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let profile = config.profile()?;
        Ok(Self {
            codepage_id: config.codepage.id,
            baseline: config.style,
            header: config.header.clone(),
            qr: config.qr.clone(),
            image: config.image.clone(),
            image_width: config.image_width()?,
            paper_width: profile.width_dots as u32,
        })
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        let config = Config::default();
        let width = crate::printer::PrinterConfig::default().width_dots as u32;
        Self {
            codepage_id: config.codepage.id,
            baseline: config.style,
            header: config.header,
            qr: config.qr,
            image: config.image,
            image_width: width,
            paper_width: width,
        }
    }
}

pub struct RenderingEngine<D: Device> {
    device: D,
    settings: RenderSettings,
    rasterizer: Rasterizer,
    state: PrinterState,
}

impl<D: Device> RenderingEngine<D> {
    /// Take ownership of the device and start a session: initialize, select
    /// the code page and apply the baseline style.
    pub fn new(device: D, settings: RenderSettings) -> Result<Self> {
        let state = PrinterState {
            baseline: settings.baseline,
            mode: DeviceMode::Text,
        };
        let mut engine = Self {
            device,
            rasterizer: Rasterizer::new(settings.clone()),
            settings,
            state,
        };
        engine.reinitialize()?;
        info!(codepage = engine.settings.codepage_id, "printer session started");
        Ok(engine)
    }

    pub fn state(&self) -> PrinterState {
        self.state
    }

    /// A handle for the device-free half of rendering.
    pub fn rasterizer(&self) -> Rasterizer {
        self.rasterizer.clone()
    }

    /// Print one task: prepare its artwork, then emit it.
    pub fn render(&mut self, task: &PrintTask) -> Result<()> {
        let artwork = self.rasterizer.prepare(task)?;
        self.emit(task, &artwork)
    }

    /// Send a task whose artwork is already prepared.
    #[instrument(skip(self, task, artwork), fields(kind = task.kind()))]
    pub fn emit(&mut self, task: &PrintTask, artwork: &Artwork) -> Result<()> {
        self.begin_task()?;

        if let Some(header) = &task.header {
            if self.settings.header.enabled {
                self.header(header)?;
            }
        }

        match (&task.payload, artwork) {
            (Payload::Text(TextContent::Plain(text)), _) => self.device.line(text)?,
            (Payload::Text(TextContent::Segments(segments)), _) => self.segments(segments)?,
            (Payload::Qr { .. }, Artwork::Qr(bitmap)) => self.qr(bitmap)?,
            (Payload::Image(_), Artwork::Image(prepared)) => self.image(prepared)?,
            (Payload::Qr { .. }, _) => {
                return Err(PrintboxError::Qr("symbol was not rasterized".into()));
            }
            (Payload::Image(_), _) => {
                return Err(PrintboxError::Image("image was not prepared".into()));
            }
        }

        self.cut()?;
        info!(preview = %task.preview(), "printed");
        Ok(())
    }

    /// Online state and paper level. Never fails: an unreachable printer is
    /// reported as offline with unknown paper.
    pub fn status(&mut self) -> PrinterStatus {
        let online = match self.device.is_online() {
            Ok(online) => online,
            Err(e) => {
                warn!(error = %e, "online status query failed");
                return PrinterStatus::UNREACHABLE;
            }
        };
        let paper = self.device.paper_status().unwrap_or_else(|e| {
            warn!(error = %e, "paper status query failed");
            PaperStatus::Unknown
        });
        PrinterStatus { online, paper }
    }

    // ========================================================================
    // STATE
    // ========================================================================

    fn begin_task(&mut self) -> Result<()> {
        if self.state.mode == DeviceMode::Graphics {
            debug!("device left in graphics mode, reinitializing");
            self.reinitialize()
        } else {
            self.apply_baseline()
        }
    }

    /// `ESC @`, `ESC t n`, then the baseline.
    fn reinitialize(&mut self) -> Result<()> {
        self.device
            .write_raw(&commands::reinitialize(self.settings.codepage_id))?;
        self.state.mode = DeviceMode::Text;
        self.apply_baseline()
    }

    fn apply(&mut self, command: StyleCommand) -> Result<()> {
        match self.device.set_style(command) {
            Err(e) if e.is_unsupported() => {
                debug!(?command, "style command unsupported, skipped");
                Ok(())
            }
            other => other,
        }
    }

    fn apply_baseline(&mut self) -> Result<()> {
        let b = self.state.baseline;
        for command in [
            StyleCommand::Align(b.align),
            StyleCommand::Font(b.font),
            StyleCommand::Bold(false),
            StyleCommand::Underline(b.underline),
            StyleCommand::Invert(b.invert),
            StyleCommand::Size {
                width: b.width,
                height: b.height,
            },
            StyleCommand::Density(b.density),
            StyleCommand::Smooth(b.smooth),
            StyleCommand::Flip(b.flip),
        ] {
            self.apply(command)?;
        }
        Ok(())
    }

    /// Apply only the keys present in `style`.
    fn apply_segment_style(&mut self, style: &SegmentStyle) -> Result<()> {
        if let Some(bold) = style.bold {
            self.apply(StyleCommand::Bold(bold))?;
        }
        if let Some(level) = style.underline {
            self.apply(StyleCommand::Underline(level))?;
        }
        if let Some(invert) = style.invert {
            self.apply(StyleCommand::Invert(invert))?;
        }
        if let Some(font) = style.font {
            self.apply(StyleCommand::Font(font))?;
        }
        if style.double_width.is_some() || style.double_height.is_some() {
            let b = self.state.baseline;
            let width = if style.double_width == Some(true) { 2 } else { b.width };
            let height = if style.double_height == Some(true) { 2 } else { b.height };
            self.apply(StyleCommand::Size { width, height })?;
        }
        Ok(())
    }

    /// Apply `style`, run `write`, then reset to the baseline whatever
    /// `write` returned.
    fn with_style<F>(&mut self, style: &SegmentStyle, write: F) -> Result<()>
    where
        F: FnOnce(&mut D) -> Result<()>,
    {
        let result = self
            .apply_segment_style(style)
            .and_then(|()| write(&mut self.device));
        let reset = self.apply_baseline();
        result.and(reset)
    }

    // ========================================================================
    // PHASES
    // ========================================================================

    fn header(&mut self, header: &HeaderInfo) -> Result<()> {
        let width = self.settings.header.width;
        self.apply(StyleCommand::Font(Font::B))?;

        let line: String = format!("{} {}", header.timestamp, header.user)
            .chars()
            .take(width)
            .collect();
        self.device.line(&line)?;
        self.device.line(&"-".repeat(width))?;
        self.device.line("")?;

        self.apply_baseline()
    }

    fn segments(&mut self, segments: &[Segment]) -> Result<()> {
        for segment in segments {
            self.with_style(&segment.style, |device| device.text(&segment.text))?;
        }
        self.device.line("")
    }

    fn qr(&mut self, bitmap: &Bitmap) -> Result<()> {
        self.apply(StyleCommand::Align(self.settings.qr.align))?;
        self.apply(StyleCommand::Density(self.settings.qr.density))?;

        self.state.mode = DeviceMode::Graphics;
        self.device.raster(bitmap, self.settings.qr.raster)?;
        self.reinitialize()
    }

    fn image(&mut self, prepared: &Prepared) -> Result<()> {
        self.apply(StyleCommand::Density(self.settings.image.density))?;

        self.state.mode = DeviceMode::Graphics;
        for fragment in prepared.bitmap.fragments(self.settings.image.fragment_height) {
            self.device.raster(&fragment, self.settings.image.raster)?;
        }
        self.reinitialize()
    }

    fn cut(&mut self) -> Result<()> {
        for form in CUT_FORMS {
            match self.device.cut(form) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_unsupported() => debug!(?form, "cut form rejected"),
                Err(e) => return Err(e),
            }
        }
        warn!("no cut form accepted, paper not cut");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCall, RecordingDevice};
    use crate::protocol::text::Alignment;
    use crate::render::RasterImpl;
    use crate::segment::{Span, segment};
    use crate::task::TransientImage;
    use pretty_assertions::assert_eq;

    fn engine() -> (RenderingEngine<RecordingDevice>, RecordingDevice) {
        let recorder = RecordingDevice::new();
        let engine = RenderingEngine::new(recorder.clone(), RenderSettings::default()).unwrap();
        recorder.clear();
        (engine, recorder)
    }

    fn baseline_calls() -> Vec<DeviceCall> {
        let b = BaselineStyle::default();
        vec![
            DeviceCall::Style(StyleCommand::Align(b.align)),
            DeviceCall::Style(StyleCommand::Font(b.font)),
            DeviceCall::Style(StyleCommand::Bold(false)),
            DeviceCall::Style(StyleCommand::Underline(b.underline)),
            DeviceCall::Style(StyleCommand::Invert(b.invert)),
            DeviceCall::Style(StyleCommand::Size { width: 1, height: 1 }),
            DeviceCall::Style(StyleCommand::Density(b.density)),
            DeviceCall::Style(StyleCommand::Smooth(false)),
            DeviceCall::Style(StyleCommand::Flip(false)),
        ]
    }

    fn reinit_calls() -> Vec<DeviceCall> {
        let mut calls = vec![DeviceCall::Raw(commands::reinitialize(6))];
        calls.extend(baseline_calls());
        calls
    }

    #[test]
    fn test_session_start() {
        let recorder = RecordingDevice::new();
        RenderingEngine::new(recorder.clone(), RenderSettings::default()).unwrap();
        assert_eq!(recorder.calls(), reinit_calls());
    }

    #[test]
    fn test_plain_text_task() {
        let (mut engine, recorder) = engine();
        engine.render(&PrintTask::text("hello")).unwrap();

        let mut expected = baseline_calls();
        expected.push(DeviceCall::Line("hello".into()));
        expected.push(DeviceCall::Cut(CutForm::Partial));
        assert_eq!(recorder.calls(), expected);
    }

    #[test]
    fn test_segments_reset_after_each() {
        let (mut engine, recorder) = engine();
        let segments = segment("Hello world", &[Span::new(0, 5, "bold"), Span::new(6, 5, "code")]);
        engine.render(&PrintTask::segments(segments).unwrap()).unwrap();

        let mut expected = baseline_calls();
        expected.push(DeviceCall::Style(StyleCommand::Bold(true)));
        expected.push(DeviceCall::Text("Hello".into()));
        expected.extend(baseline_calls());
        expected.push(DeviceCall::Text(" ".into()));
        expected.extend(baseline_calls());
        expected.push(DeviceCall::Style(StyleCommand::Font(Font::B)));
        expected.push(DeviceCall::Text("world".into()));
        expected.extend(baseline_calls());
        expected.push(DeviceCall::Line(String::new()));
        expected.push(DeviceCall::Cut(CutForm::Partial));
        assert_eq!(recorder.calls(), expected);
    }

    #[test]
    fn test_reset_issued_even_when_write_fails() {
        let (mut engine, recorder) = engine();
        recorder.fail_on_text("boom");
        let task = PrintTask::segments(vec![
            Segment::new("boom", SegmentStyle { bold: Some(true), ..Default::default() }),
            Segment::plain("never"),
        ])
        .unwrap();

        assert!(engine.render(&task).is_err());

        let calls = recorder.calls();
        let tail = &calls[calls.len() - baseline_calls().len()..];
        assert_eq!(tail, baseline_calls().as_slice());
        assert!(!calls.contains(&DeviceCall::Text("never".into())));
        assert!(!calls.iter().any(|c| matches!(c, DeviceCall::Cut(_))));
    }

    #[test]
    fn test_blockquote_doubles_size() {
        let (mut engine, recorder) = engine();
        let segments = segment("quote", &[Span::new(0, 5, "blockquote")]);
        engine.render(&PrintTask::segments(segments).unwrap()).unwrap();
        assert!(recorder.calls().contains(&DeviceCall::Style(StyleCommand::Size {
            width: 2,
            height: 2
        })));
    }

    #[test]
    fn test_header() {
        let (mut engine, recorder) = engine();
        let task = PrintTask::text("body")
            .with_header(HeaderInfo::new("2024-05-01 12:00", "@someone_with_a_really_long_name"));
        engine.render(&task).unwrap();

        let calls = recorder.calls();
        let header_start = baseline_calls().len();
        assert_eq!(calls[header_start], DeviceCall::Style(StyleCommand::Font(Font::B)));
        let DeviceCall::Line(line) = &calls[header_start + 1] else {
            panic!("expected header line, got {:?}", calls[header_start + 1]);
        };
        assert_eq!(line.chars().count(), 42);
        assert!(line.starts_with("2024-05-01 12:00 @someone"));
        assert_eq!(calls[header_start + 2], DeviceCall::Line("-".repeat(42)));
        assert_eq!(calls[header_start + 3], DeviceCall::Line(String::new()));
        assert_eq!(
            &calls[header_start + 4..header_start + 4 + baseline_calls().len()],
            baseline_calls().as_slice()
        );
    }

    #[test]
    fn test_header_disabled() {
        let recorder = RecordingDevice::new();
        let mut settings = RenderSettings::default();
        settings.header.enabled = false;
        let mut engine = RenderingEngine::new(recorder.clone(), settings).unwrap();
        recorder.clear();

        engine
            .render(&PrintTask::text("x").with_header(HeaderInfo::new("t", "u")))
            .unwrap();
        assert!(!recorder.calls().contains(&DeviceCall::Line("-".repeat(42))));
    }

    #[test]
    fn test_qr_reinitializes() {
        let (mut engine, recorder) = engine();
        engine.render(&PrintTask::qr("Привет")).unwrap();

        let calls = recorder.calls();
        let raster = calls
            .iter()
            .position(|c| matches!(c, DeviceCall::Raster { .. }))
            .unwrap();
        assert!(matches!(
            calls[raster],
            DeviceCall::Raster { implementation: RasterImpl::BitImageColumn, .. }
        ));
        assert_eq!(calls[raster - 2], DeviceCall::Style(StyleCommand::Align(Alignment::Center)));
        assert_eq!(calls[raster - 1], DeviceCall::Style(StyleCommand::Density(3)));
        assert_eq!(&calls[raster + 1..raster + 1 + reinit_calls().len()], reinit_calls().as_slice());
        assert_eq!(engine.state().mode, DeviceMode::Text);
    }

    #[test]
    fn test_qr_center_pads_to_paper_width() {
        let recorder = RecordingDevice::new();
        let mut settings = RenderSettings::default();
        settings.qr.center = true;
        let mut engine = RenderingEngine::new(recorder.clone(), settings).unwrap();

        engine.render(&PrintTask::qr("hi")).unwrap();
        assert!(recorder.calls().iter().any(|c| matches!(
            c,
            DeviceCall::Raster { width: 576, .. }
        )));
    }

    #[test]
    fn test_failed_raster_forces_reinit_next_task() {
        let (mut engine, recorder) = engine();
        recorder.fail_rasters(true);
        assert!(engine.render(&PrintTask::qr("data")).is_err());
        assert_eq!(engine.state().mode, DeviceMode::Graphics);

        recorder.fail_rasters(false);
        recorder.clear();
        engine.render(&PrintTask::text("after")).unwrap();

        let calls = recorder.calls();
        assert_eq!(&calls[..reinit_calls().len()], reinit_calls().as_slice());
        assert_eq!(calls[reinit_calls().len()], DeviceCall::Line("after".into()));
    }

    #[test]
    fn test_cut_falls_through_unsupported_forms() {
        let (mut engine, recorder) = engine();
        recorder.reject_cut(CutForm::Partial);
        recorder.reject_cut(CutForm::Mode(CutMode::Part));
        engine.render(&PrintTask::text("x")).unwrap();
        assert_eq!(recorder.calls().last(), Some(&DeviceCall::Cut(CutForm::Bare)));
    }

    #[test]
    fn test_unsupported_style_skipped() {
        let (mut engine, recorder) = engine();
        recorder.reject_style(StyleCommand::Density(0));
        engine.render(&PrintTask::text("still prints")).unwrap();
        let calls = recorder.calls();
        assert!(calls.contains(&DeviceCall::Line("still prints".into())));
        assert!(!calls.iter().any(|c| matches!(c, DeviceCall::Style(StyleCommand::Density(_)))));
    }

    #[test]
    fn test_status_reports_device() {
        let (mut engine, _) = engine();
        assert_eq!(
            engine.status(),
            PrinterStatus {
                online: true,
                paper: PaperStatus::Adequate
            }
        );
    }

    #[test]
    fn test_unreadable_image_touches_no_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"jpeg?").unwrap();

        let (mut engine, recorder) = engine();
        let task = PrintTask::image(TransientImage::borrowed(&path));
        assert!(matches!(engine.render(&task), Err(PrintboxError::Image(_))));
        assert_eq!(recorder.calls(), Vec::new());
        assert_eq!(engine.state().mode, DeviceMode::Text);
    }

    #[test]
    fn test_emit_requires_matching_artwork() {
        let (mut engine, recorder) = engine();
        let err = engine.emit(&PrintTask::qr("x"), &Artwork::Empty).unwrap_err();
        assert!(matches!(err, PrintboxError::Qr(_)));
        assert!(!recorder.calls().iter().any(|c| matches!(c, DeviceCall::Raster { .. })));
    }

    #[test]
    fn test_emit_prepared_qr() {
        let (mut engine, recorder) = engine();
        let task = PrintTask::qr("prepared");
        let artwork = engine.rasterizer().prepare(&task).unwrap();
        engine.emit(&task, &artwork).unwrap();
        assert_eq!(recorder.calls().last(), Some(&DeviceCall::Cut(CutForm::Partial)));
    }
}
