//! # In-Memory Transport
//!
//! Captures everything written and answers status queries from preset
//! bytes. Used by the `device.mock` setting and throughout the tests.
//!
//! Clones share state, so a test can keep one handle for inspection while
//! the device owns another:
//!
//! ```
//! use printbox::transport::{MockTransport, Transport};
//!
//! let mock = MockTransport::new();
//! let mut handle = mock.clone();
//! handle.write_all(b"hello").unwrap();
//! assert_eq!(mock.written(), b"hello");
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use super::Transport;
use crate::error::{PrintboxError, Result};

/// Idle `DLE EOT 1` answer: fixed bits 1 and 4 set, offline bit clear.
pub const STATUS_ONLINE: u8 = 0x12;

/// Idle `DLE EOT 4` answer: fixed bits set, no paper sensor bits.
pub const STATUS_PAPER_OK: u8 = 0x12;

#[derive(Debug)]
struct MockState {
    written: Vec<u8>,
    writes: usize,
    failing_writes: usize,
    printer_status: Option<u8>,
    paper_status: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                written: Vec::new(),
                writes: 0,
                failing_writes: 0,
                printer_status: Some(STATUS_ONLINE),
                paper_status: Some(STATUS_PAPER_OK),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All bytes written so far.
    pub fn written(&self) -> Vec<u8> {
        self.state().written.clone()
    }

    /// Number of `write_all` calls, failed ones included.
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    pub fn clear(&self) {
        self.state().written.clear();
    }

    /// Make the next `count` writes fail with a transport error.
    pub fn fail_next_writes(&self, count: usize) {
        self.state().failing_writes = count;
    }

    /// Answers for `DLE EOT 1` and `DLE EOT 4`. `None` makes that query time out.
    pub fn set_status(&self, printer: Option<u8>, paper: Option<u8>) {
        let mut state = self.state();
        state.printer_status = printer;
        state.paper_status = paper;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state();
        state.writes += 1;
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(PrintboxError::Transport("mock write failure".into()));
        }
        state.written.extend_from_slice(data);
        Ok(())
    }

    fn query(&mut self, request: &[u8]) -> Result<u8> {
        let state = self.state();
        let answer = match request.last() {
            Some(1) => state.printer_status,
            Some(4) => state.paper_status,
            _ => None,
        };
        answer.ok_or_else(|| PrintboxError::Transport("status query timed out".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::commands::{StatusRequest, status_request};

    #[test]
    fn test_scripted_failures() {
        let mut mock = MockTransport::new();
        mock.fail_next_writes(1);
        assert!(mock.write_all(b"a").is_err());
        mock.write_all(b"b").unwrap();
        assert_eq!(mock.written(), b"b");
        assert_eq!(mock.write_count(), 2);
    }

    #[test]
    fn test_status_answers() {
        let mut mock = MockTransport::new();
        assert_eq!(mock.query(&status_request(StatusRequest::Printer)).unwrap(), STATUS_ONLINE);

        mock.set_status(Some(0x1A), None);
        assert_eq!(mock.query(&status_request(StatusRequest::Printer)).unwrap(), 0x1A);
        assert!(mock.query(&status_request(StatusRequest::RollPaper)).is_err());
    }

    #[test]
    fn test_queries_are_not_recorded() {
        let mut mock = MockTransport::new();
        mock.query(&status_request(StatusRequest::Printer)).unwrap();
        assert!(mock.written().is_empty());
    }
}
