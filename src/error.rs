//! # Error Types
//!
//! This module defines error types used throughout the printbox library.

use thiserror::Error;

/// Main error type for printbox operations
#[derive(Debug, Error)]
pub enum PrintboxError {
    /// Transport-level errors (connection, I/O, status timeouts)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Command or call form not supported by the device profile.
    ///
    /// Style commands failing this way are skipped; cut forms failing this
    /// way fall through to the next form.
    #[error("Unsupported command: {0}")]
    Unsupported(String),

    /// Image decoding or processing error
    #[error("Image error: {0}")]
    Image(String),

    /// QR code encoding error
    #[error("QR error: {0}")]
    Qr(String),

    /// Invalid configuration value
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrintboxError {
    /// True when the error is a structural rejection rather than a device failure.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, PrintboxError>;
