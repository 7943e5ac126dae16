//! Code page encoding for printer text
//!
//! ESC/POS printers interpret bytes 0x80-0xFF according to the code table
//! selected with `ESC t n`. Text therefore has to be converted from UTF-8 to
//! the matching single-byte encoding before it is sent; raw UTF-8 prints as
//! mojibake.
//!
//! Characters with no representation in the target code page are replaced
//! with `?`.

use encoding_rs::{EncoderResult, Encoding};
use tracing::{instrument, warn};

use crate::error::{PrintboxError, Result};

/// A text encoder bound to one code page.
#[derive(Debug, Clone, Copy)]
pub struct Codepage {
    encoding: &'static Encoding,
}

impl Codepage {
    /// Look up an encoding by label ("cp1251", "windows-1251", "cp866", ...).
    pub fn for_label(label: &str) -> Result<Self> {
        Encoding::for_label(label.trim().as_bytes())
            .map(|encoding| Self { encoding })
            .ok_or_else(|| PrintboxError::Config(format!("unknown code page '{}'", label)))
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Encode `text`, replacing unmappable characters with `?`.
    #[instrument(skip(text), fields(codepage = self.name(), len = text.len()))]
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let mut encoder = self.encoding.new_encoder();
        let mut out = Vec::with_capacity(text.len() + 16);
        let mut src = text;
        let mut replaced = 0usize;

        loop {
            let needed = encoder
                .max_buffer_length_from_utf8_without_replacement(src.len())
                .unwrap_or(src.len() * 4 + 16);
            out.reserve(needed);

            let (result, read) =
                encoder.encode_from_utf8_to_vec_without_replacement(src, &mut out, true);
            src = &src[read..];

            match result {
                EncoderResult::InputEmpty => break,
                EncoderResult::OutputFull => continue,
                EncoderResult::Unmappable(_) => {
                    replaced += 1;
                    out.push(b'?');
                }
            }
        }

        if replaced > 0 {
            warn!(replaced, "characters not representable in code page");
        }
        out
    }
}

impl Default for Codepage {
    fn default() -> Self {
        Self {
            encoding: encoding_rs::WINDOWS_1251,
        }
    }
}
