//! # Entity Segmentation
//!
//! Converts message text plus style annotations ("entities") into an ordered
//! list of [`Segment`]s, each carrying one combined printer style.
//!
//! ## Indexing
//!
//! Entity offsets and lengths arrive in UTF-16 code units. Rust strings are
//! worked on here as codepoint sequences, so every span is translated before
//! use:
//!
//! ```text
//! text:      "😀 bold"
//! codepoint:  0  1 2345
//! utf-16:     01 2 3456
//! ```
//!
//! A span `(3, 4)` in UTF-16 covers codepoints `2..6` ("bold"). Indexing the
//! codepoints directly with `3..7` would shift the style by one character.
//!
//! ## Merging Policy
//!
//! Boundaries from every span cut the text into sub-ranges. A sub-range takes
//! the union of the styles of spans that cover it *entirely*; a span that only
//! partially overlaps a sub-range contributes nothing to it.
//!
//! ## Example
//!
//! ```
//! use printbox::segment::{segment, Span};
//!
//! let segments = segment(
//!     "Hello world",
//!     &[Span::new(0, 5, "bold"), Span::new(6, 5, "code")],
//! );
//! let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
//! assert_eq!(texts, ["Hello", " ", "world"]);
//! assert_eq!(segments[0].style.bold, Some(true));
//! assert!(segments[1].style.is_empty());
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::protocol::text::Font;

/// A style annotation as delivered by the message source.
///
/// `offset` and `length` are UTF-16 code units. They are signed so that
/// malformed input (negative values) can be represented and discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub offset: i64,
    pub length: i64,
    pub kind: String,
}

impl Span {
    pub fn new(offset: i64, length: i64, kind: impl Into<String>) -> Self {
        Self {
            offset,
            length,
            kind: kind.into(),
        }
    }
}

/// The closed vocabulary of annotation kinds.
///
/// Matching is case-sensitive on the kind name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Bold,
    Underline,
    Strikethrough,
    Code,
    Pre,
    Blockquote,
    /// Recognised, but deliberately renders with no style.
    Italic,
    /// Anything else (links, mentions, spoilers...). Renders with no style.
    Other,
}

impl SpanKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "bold" => Self::Bold,
            "underline" => Self::Underline,
            "strikethrough" => Self::Strikethrough,
            "code" => Self::Code,
            "pre" => Self::Pre,
            "blockquote" => Self::Blockquote,
            "italic" => Self::Italic,
            _ => Self::Other,
        }
    }

    /// The printer style this kind maps to.
    pub fn style(self) -> SegmentStyle {
        let mut style = SegmentStyle::default();
        match self {
            Self::Bold => style.bold = Some(true),
            Self::Underline => style.underline = Some(1),
            Self::Strikethrough => style.invert = Some(true),
            Self::Code | Self::Pre => style.font = Some(Font::B),
            Self::Blockquote => {
                style.double_height = Some(true);
                style.double_width = Some(true);
            }
            Self::Italic | Self::Other => {}
        }
        style
    }
}

/// Sparse printer style for one segment.
///
/// Each key is optional: `None` means "leave the device setting alone".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentStyle {
    pub bold: Option<bool>,
    pub underline: Option<u8>,
    pub invert: Option<bool>,
    pub font: Option<Font>,
    pub double_height: Option<bool>,
    pub double_width: Option<bool>,
}

impl SegmentStyle {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Union of two styles. Keys set in `other` win.
    pub fn merge(self, other: SegmentStyle) -> SegmentStyle {
        SegmentStyle {
            bold: other.bold.or(self.bold),
            underline: other.underline.or(self.underline),
            invert: other.invert.or(self.invert),
            font: other.font.or(self.font),
            double_height: other.double_height.or(self.double_height),
            double_width: other.double_width.or(self.double_width),
        }
    }
}

/// A contiguous run of text sharing one combined style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub style: SegmentStyle,
}

impl Segment {
    /// `text` must not be empty.
    pub fn new(text: impl Into<String>, style: SegmentStyle) -> Self {
        let text = text.into();
        debug_assert!(!text.is_empty(), "segment text must not be empty");
        Self { text, style }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, SegmentStyle::default())
    }
}

/// A span translated to codepoint indices.
struct Resolved {
    start: usize,
    end: usize,
    style: SegmentStyle,
}

/// Split `text` into styled segments according to `spans`.
///
/// Pure and deterministic. Out-of-range spans are clamped, empty ones and
/// malformed ones are dropped; nothing here fails.
pub fn segment(text: &str, spans: &[Span]) -> Vec<Segment> {
    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let (unit_starts, total_units) = utf16_starts(&chars);
    let resolved: Vec<Resolved> = spans
        .iter()
        .filter_map(|span| resolve(span, &unit_starts, total_units))
        .collect();

    if resolved.is_empty() {
        return vec![Segment::plain(text)];
    }

    let mut boundaries = vec![0, chars.len()];
    for span in &resolved {
        boundaries.push(span.start);
        boundaries.push(span.end);
    }
    boundaries.sort_unstable();
    boundaries.dedup();

    boundaries
        .windows(2)
        .map(|pair| {
            let (start, end) = (pair[0], pair[1]);
            let style = resolved
                .iter()
                .filter(|span| span.start <= start && span.end >= end)
                .fold(SegmentStyle::default(), |acc, span| acc.merge(span.style));
            Segment::new(chars[start..end].iter().collect::<String>(), style)
        })
        .collect()
}

/// UTF-16 code unit offset at which each codepoint starts, plus the total.
fn utf16_starts(chars: &[char]) -> (Vec<usize>, usize) {
    let mut starts = Vec::with_capacity(chars.len());
    let mut unit = 0;
    for ch in chars {
        starts.push(unit);
        unit += ch.len_utf16();
    }
    (starts, unit)
}

/// Index of the first codepoint starting at or after UTF-16 offset `target`.
fn codepoint_index(unit_starts: &[usize], target: usize) -> usize {
    unit_starts.partition_point(|&start| start < target)
}

fn resolve(span: &Span, unit_starts: &[usize], total_units: usize) -> Option<Resolved> {
    let Some(end_units) = span.offset.checked_add(span.length) else {
        debug!(offset = span.offset, length = span.length, kind = %span.kind, "skipping malformed span");
        return None;
    };

    let total = total_units as i64;
    let start_cu = span.offset.clamp(0, total);
    let end_cu = end_units.clamp(start_cu, total);

    let start = codepoint_index(unit_starts, start_cu as usize);
    let end = codepoint_index(unit_starts, end_cu as usize);
    if start >= end {
        return None;
    }

    Some(Resolved {
        start,
        end,
        style: SpanKind::parse(&span.kind).style(),
    })
}
