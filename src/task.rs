//! # Print Tasks
//!
//! A [`PrintTask`] is one unit of work for the queue: an optional header
//! followed by exactly one payload (text, QR code or image).
//!
//! ```
//! use printbox::task::{HeaderInfo, PrintTask};
//!
//! let task = PrintTask::qr("https://example.com")
//!     .with_header(HeaderInfo::new("2024-05-01 12:00", "@alice"));
//! assert_eq!(task.kind(), "qr");
//! assert!(task.header.is_some());
//! ```
//!
//! Tasks are consumed exactly once and are deliberately not `Clone`: an image
//! task owns its transient file, which is removed when the task is dropped.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::segment::Segment;

/// Characters of content shown in log lines.
const PREVIEW_CHARS: usize = 50;

/// Who sent a task and when, printed above the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInfo {
    pub timestamp: String,
    pub user: String,
}

impl HeaderInfo {
    pub fn new(timestamp: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            user: user.into(),
        }
    }

    /// Header stamped with the current local time.
    pub fn now(user: impl Into<String>) -> Self {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M").to_string();
        Self::new(timestamp, user)
    }
}

/// A segment list with at least one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct NonEmptySegments(Vec<Segment>);

impl NonEmptySegments {
    /// Returns `None` for an empty list.
    pub fn new(segments: Vec<Segment>) -> Option<Self> {
        if segments.is_empty() {
            None
        } else {
            Some(Self(segments))
        }
    }

    pub fn as_slice(&self) -> &[Segment] {
        &self.0
    }
}

impl Deref for NonEmptySegments {
    type Target = [Segment];

    fn deref(&self) -> &[Segment] {
        &self.0
    }
}

/// Text body: either a single unstyled string or styled segments.
#[derive(Debug, Clone, PartialEq)]
pub enum TextContent {
    Plain(String),
    Segments(NonEmptySegments),
}

impl TextContent {
    /// Wrap a segment list. Returns `None` for an empty list.
    pub fn segments(segments: Vec<Segment>) -> Option<Self> {
        NonEmptySegments::new(segments).map(Self::Segments)
    }

    /// The text without any styling.
    pub fn plain_text(&self) -> String {
        match self {
            Self::Plain(text) => text.clone(),
            Self::Segments(segments) => segments.iter().map(|s| s.text.as_str()).collect(),
        }
    }
}

/// A raster file on disk that belongs to one task.
///
/// The file is removed when this value is dropped, which happens once the
/// task has either printed or exhausted its retries. Removal failures are
/// logged and otherwise ignored.
#[derive(Debug)]
pub struct TransientImage {
    path: PathBuf,
    remove_on_drop: bool,
}

impl TransientImage {
    /// Take ownership of a downloaded file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            remove_on_drop: true,
        }
    }

    /// Reference a file the caller keeps; it is left in place on drop.
    pub fn borrowed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            remove_on_drop: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TransientImage {
    fn drop(&mut self) {
        if !self.remove_on_drop {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed transient image"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove transient image"),
        }
    }
}

/// What a task prints.
#[derive(Debug)]
pub enum Payload {
    Text(TextContent),
    Qr { data: String },
    Image(TransientImage),
}

/// One queued print job.
#[derive(Debug)]
pub struct PrintTask {
    pub header: Option<HeaderInfo>,
    pub payload: Payload,
}

impl PrintTask {
    pub fn new(header: Option<HeaderInfo>, payload: Payload) -> Self {
        Self { header, payload }
    }

    /// Unstyled text.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(None, Payload::Text(TextContent::Plain(text.into())))
    }

    /// Styled text. There is no task for an empty segment list.
    pub fn segments(segments: Vec<Segment>) -> Option<Self> {
        TextContent::segments(segments).map(|content| Self::new(None, Payload::Text(content)))
    }

    pub fn qr(data: impl Into<String>) -> Self {
        Self::new(None, Payload::Qr { data: data.into() })
    }

    pub fn image(image: TransientImage) -> Self {
        Self::new(None, Payload::Image(image))
    }

    pub fn with_header(mut self, header: HeaderInfo) -> Self {
        self.header = Some(header);
        self
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match &self.payload {
            Payload::Text(TextContent::Plain(_)) => "text",
            Payload::Text(TextContent::Segments(_)) => "segments",
            Payload::Qr { .. } => "qr",
            Payload::Image(_) => "image",
        }
    }

    /// The first characters of the content, for log lines.
    pub fn preview(&self) -> String {
        let full = match &self.payload {
            Payload::Text(content) => content.plain_text(),
            Payload::Qr { data } => data.clone(),
            Payload::Image(image) => image.path().display().to_string(),
        };
        full.chars().take(PREVIEW_CHARS).collect()
    }
}
