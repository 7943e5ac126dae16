//! # Printer Transport Layer
//!
//! This module provides byte channels to the printer. Everything above this
//! layer speaks in ESC/POS bytes; a transport only moves them.
//!
//! ## Available Transports
//!
//! - [`serial`]: raw-mode TTY (`/dev/serial0`, USB adapters)
//! - [`mock`]: in-memory capture for tests and printer-less setups

pub mod mock;
pub mod serial;

pub use mock::MockTransport;
pub use serial::{SerialSettings, SerialTransport};

use crate::error::Result;

/// A bidirectional byte channel to a printer.
pub trait Transport: Send {
    /// Send all bytes, in order.
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Send a real-time status request and read the single response byte.
    fn query(&mut self, request: &[u8]) -> Result<u8>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_all(data)
    }

    fn query(&mut self, request: &[u8]) -> Result<u8> {
        (**self).query(request)
    }
}
