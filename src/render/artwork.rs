//! # Artwork Preparation
//!
//! Everything a task needs before the device is involved: QR symbols are
//! rasterized and photos are decoded, oriented, resized and dithered here.
//! The queue runs this step without holding the device, so a slow codec
//! never delays a status query.
//!
//! ```text
//! PrintTask ─► Rasterizer::prepare ─► Artwork ─► RenderingEngine::emit ─► device
//!              (no device access)                (device held)
//! ```

use std::sync::Arc;

use tracing::debug;

use super::engine::RenderSettings;
use super::image::{self, Prepared};
use super::{Bitmap, qr};
use crate::error::{PrintboxError, Result};
use crate::protocol::text::Alignment;
use crate::task::{Payload, PrintTask, TransientImage};

/// Graphics for one task, ready to send.
#[derive(Debug, Clone)]
pub enum Artwork {
    /// Text payloads carry no graphics
    Empty,
    Qr(Bitmap),
    Image(Prepared),
}

/// Builds [`Artwork`] from tasks. Cheap to clone and safe to share.
#[derive(Debug, Clone)]
pub struct Rasterizer {
    settings: Arc<RenderSettings>,
}

impl Rasterizer {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    pub fn prepare(&self, task: &PrintTask) -> Result<Artwork> {
        match &task.payload {
            Payload::Text(_) => Ok(Artwork::Empty),
            Payload::Qr { data } => self.qr(data).map(Artwork::Qr),
            Payload::Image(image) => self.image(image).map(Artwork::Image),
        }
    }

    fn qr(&self, data: &str) -> Result<Bitmap> {
        let mut bitmap = qr::render(data, self.settings.qr.module_size)?;
        if self.settings.qr.center {
            bitmap = bitmap.placed(self.settings.paper_width, Alignment::Center);
        }
        debug!(side = bitmap.height(), width = bitmap.width(), "qr rasterized");
        Ok(bitmap)
    }

    fn image(&self, file: &TransientImage) -> Result<Prepared> {
        let source = image::load(file.path())?;
        let prepared = image::prepare(source, self.settings.image_width, &self.settings.image);
        if prepared.bitmap.is_empty() {
            return Err(PrintboxError::Image("image has no pixels".into()));
        }
        debug!(
            steps = ?prepared.steps.iter().map(|r| r.step).collect::<Vec<_>>(),
            "image pipeline"
        );
        Ok(prepared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::image::Step;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_needs_no_artwork() {
        let rasterizer = Rasterizer::new(RenderSettings::default());
        assert!(matches!(
            rasterizer.prepare(&PrintTask::text("hi")).unwrap(),
            Artwork::Empty
        ));
    }

    #[test]
    fn test_qr_centered_on_paper() {
        let mut settings = RenderSettings::default();
        settings.qr.center = true;
        let Artwork::Qr(bitmap) = Rasterizer::new(settings).prepare(&PrintTask::qr("hi")).unwrap()
        else {
            panic!("expected a qr bitmap");
        };
        assert_eq!(bitmap.width(), 576);
    }

    #[test]
    fn test_photo_prepared_to_target_width() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        ::image::RgbaImage::from_pixel(60, 30, ::image::Rgba([0, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let mut settings = RenderSettings::default();
        settings.image_width = 384;
        let task = PrintTask::image(TransientImage::borrowed(&path));
        let Artwork::Image(prepared) = Rasterizer::new(settings).prepare(&task).unwrap() else {
            panic!("expected a prepared image");
        };
        assert_eq!(prepared.bitmap.width(), 384);
        assert_eq!(prepared.bitmap.height(), 768);
        assert_eq!(prepared.steps[0].step, Step::Rotate);
    }

    #[test]
    fn test_unreadable_photo_is_an_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();

        let task = PrintTask::image(TransientImage::borrowed(&path));
        let err = Rasterizer::new(RenderSettings::default()).prepare(&task).unwrap_err();
        assert!(matches!(err, PrintboxError::Image(_)));
    }
}
