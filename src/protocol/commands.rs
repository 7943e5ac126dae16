//! # ESC/POS Control Commands
//!
//! Initialization, code page selection, paper cutting and real-time status
//! requests for ESC/POS compatible thermal printers (CSN-A2, RP326 and the
//! many clones speaking the same dialect).
//!
//! ## Escape Sequence Structure
//!
//! Commands follow these patterns:
//! - Single byte: `LF`
//! - Two bytes: `ESC @`
//! - Multi-byte with parameters: `ESC t n`, `GS V m n`, `DLE EOT n`
//!
//! ## Byte Order
//!
//! Multi-byte integers use **little-endian** encoding:
//! - `u16` value 0x1234 is sent as bytes `[0x34, 0x12]`

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - Command prefix byte
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Extended command prefix
///
/// Used for character size, raster graphics, cutting and print density.
pub const GS: u8 = 0x1D;

/// DLE (Data Link Escape) - Real-time command prefix
///
/// `DLE EOT n` is processed by the printer immediately, even while the
/// receive buffer is full, which makes it suitable for status queries.
pub const DLE: u8 = 0x10;

/// EOT (End of Transmission) - second byte of the status request
pub const EOT: u8 = 0x04;

/// LF (Line Feed) - Print and advance one line
pub const LF: u8 = 0x0A;

// ============================================================================
// INITIALIZATION COMMANDS
// ============================================================================

/// # Initialize Printer (ESC @)
///
/// Resets the printer to its power-on default state and clears the print
/// buffer. This is also the only reliable way to leave graphics mode on
/// cheap serial printers: after a raster image some firmwares keep
/// interpreting incoming bytes as image data until reinitialized.
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC @ |
/// | Hex     | 1B 40 |
///
/// ## What Gets Reset
///
/// - Print buffer is cleared
/// - Bold, underline, invert, character size
/// - Alignment, line spacing
/// - Selected code page (must be re-sent with [`select_codepage`])
///
/// ## Example
///
/// ```
/// use printbox::protocol::commands;
///
/// assert_eq!(commands::init(), vec![0x1B, 0x40]);
/// ```
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// # Select Character Code Table (ESC t n)
///
/// Selects the code page used to interpret bytes 0x80-0xFF.
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | ASCII   | ESC t n  |
/// | Hex     | 1B 74 n  |
///
/// Table numbers are firmware specific. Common values:
///
/// | n | Table (Epson) | Table (CSN-A2) |
/// |---|---------------|----------------|
/// | 0 | PC437 | PC437 |
/// | 6 | Katakana* | WPC1251 (Cyrillic) |
/// | 17 | PC866 | PC866 |
/// | 46 | WPC1251 | - |
///
/// ## Example
///
/// ```
/// use printbox::protocol::commands;
///
/// assert_eq!(commands::select_codepage(6), vec![0x1B, 0x74, 6]);
/// ```
#[inline]
pub fn select_codepage(n: u8) -> Vec<u8> {
    vec![ESC, b't', n]
}

/// The full session start sequence: `ESC @` followed by `ESC t n`.
///
/// Sent when the session opens and after every raster output.
pub fn reinitialize(codepage_id: u8) -> Vec<u8> {
    let mut out = init();
    out.extend(select_codepage(codepage_id));
    out
}

// ============================================================================
// CUTTER CONTROL COMMANDS
// ============================================================================

/// # Full Cut (GS V 0)
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | ASCII   | GS V 0   |
/// | Hex     | 1D 56 00 |
#[inline]
pub fn cut_full() -> Vec<u8> {
    vec![GS, b'V', 0]
}

/// # Partial Cut (GS V 1)
///
/// Leaves a small hinge connecting the receipt to the roll.
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | ASCII   | GS V 1   |
/// | Hex     | 1D 56 01 |
#[inline]
pub fn cut_partial() -> Vec<u8> {
    vec![GS, b'V', 1]
}

/// # Feed Then Partial Cut (GS V 66 n)
///
/// Feeds `n` dot lines past the cutter, then performs a partial cut. The
/// printer accounts for the head-to-cutter distance itself.
///
/// | Format  | Bytes       |
/// |---------|-------------|
/// | ASCII   | GS V B n    |
/// | Hex     | 1D 56 42 n  |
///
/// ## Example
///
/// ```
/// use printbox::protocol::commands;
///
/// assert_eq!(commands::cut_partial_feed(3), vec![0x1D, 0x56, 0x42, 3]);
/// ```
#[inline]
pub fn cut_partial_feed(n: u8) -> Vec<u8> {
    vec![GS, b'V', 66, n]
}

/// # Print and Feed n Lines (ESC d n)
#[inline]
pub fn feed_lines(n: u8) -> Vec<u8> {
    vec![ESC, b'd', n]
}

// ============================================================================
// REAL-TIME STATUS
// ============================================================================

/// Status categories for `DLE EOT n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRequest {
    /// n = 1: printer status (bit 3 set = offline)
    Printer = 1,
    /// n = 4: roll paper sensor status
    RollPaper = 4,
}

/// # Transmit Real-Time Status (DLE EOT n)
///
/// The printer answers with a single status byte.
///
/// | Format  | Bytes       |
/// |---------|-------------|
/// | ASCII   | DLE EOT n   |
/// | Hex     | 10 04 n     |
///
/// ## Example
///
/// ```
/// use printbox::protocol::commands::{status_request, StatusRequest};
///
/// assert_eq!(status_request(StatusRequest::RollPaper), vec![0x10, 0x04, 4]);
/// ```
#[inline]
pub fn status_request(request: StatusRequest) -> Vec<u8> {
    vec![DLE, EOT, request as u8]
}

/// Offline flag in the `DLE EOT 1` response.
pub const STATUS_OFFLINE: u8 = 0x08;

/// Paper near-end bits in the `DLE EOT 4` response.
pub const STATUS_PAPER_NEAR_END: u8 = 0x0C;

/// Paper end bits in the `DLE EOT 4` response.
pub const STATUS_PAPER_END: u8 = 0x60;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Encode a u16 value as little-endian bytes [low, high]
///
/// ```
/// use printbox::protocol::commands::u16_le;
///
/// assert_eq!(u16_le(0x1234), [0x34, 0x12]);
/// assert_eq!(u16_le(384), [0x80, 0x01]);
/// ```
#[inline]
pub const fn u16_le(value: u16) -> [u8; 2] {
    [value as u8, (value >> 8) as u8]
}

// ============================================================================
// TESTS
// ============================================================================
