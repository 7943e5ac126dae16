//! # Serial TTY Transport
//!
//! Talks to ESC/POS printers wired to a UART (`/dev/serial0` on a Raspberry
//! Pi) or a USB serial adapter (`/dev/ttyUSB0`).
//!
//! ## Wiring (CSN-A2, Raspberry Pi)
//!
//! ```text
//! printer TX  ->  GPIO15 (RXD)
//! printer RX  <-  GPIO14 (TXD)
//! printer GND --  GND
//! ```
//!
//! The serial console must be disabled (`raspi-config` → Interface Options →
//! Serial Port: login shell "no", hardware "yes").
//!
//! ## TTY Configuration
//!
//! The device is opened in raw mode so binary data is transmitted without
//! modification:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR,
//!   ICRNL and XON/XOFF flow control are all off
//! - **No output processing**: OPOST off (no CR/LF translation)
//! - **Non-canonical, no echo**: ICANON, ECHO, ECHONL, ISIG, IEXTEN off
//! - **Line settings**: baud rate, data bits, parity and stop bits from
//!   [`SerialSettings`]
//! - **Reads**: `VMIN = 0`, `VTIME` = status timeout, so a silent printer
//!   produces a timeout instead of a hang
//!
//! Writes have no timeout; a stalled printer blocks the writer.
//!
//! ## Chunked Writes
//!
//! Cheap printers have small receive buffers. Large blocks are written in
//! chunks with a short pause between them.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, instrument};

use super::Transport;
use crate::config::{DeviceConfig, Parity};
use crate::error::{PrintboxError, Result};

/// Default serial device path
pub const DEFAULT_DEVICE: &str = "/dev/serial0";

/// Default chunk size for writes (bytes)
const CHUNK_SIZE: usize = 1024;

/// Delay between chunks (milliseconds)
const CHUNK_DELAY_MS: u64 = 5;

/// Serial line parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub bytesize: u8,
    pub parity: Parity,
    pub stopbits: u8,
    /// Read timeout for status queries
    pub timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            bytesize: 8,
            parity: Parity::None,
            stopbits: 1,
            timeout: Duration::from_secs(1),
        }
    }
}

impl From<&DeviceConfig> for SerialSettings {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            baud_rate: config.baud_rate,
            bytesize: config.bytesize,
            parity: config.parity,
            stopbits: config.stopbits,
            timeout: config.timeout(),
        }
    }
}

/// # Serial Printer Transport
///
/// ## Example
///
/// ```no_run
/// use printbox::protocol::commands;
/// use printbox::transport::{SerialSettings, SerialTransport, Transport};
///
/// let mut transport = SerialTransport::open("/dev/serial0", SerialSettings::default())?;
/// transport.write_all(&commands::reinitialize(6))?;
///
/// # Ok::<(), printbox::PrintboxError>(())
/// ```
pub struct SerialTransport {
    file: File,
    path: PathBuf,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl SerialTransport {
    /// Open and configure a serial device.
    ///
    /// ## Errors
    ///
    /// Returns an error if:
    /// - The device doesn't exist
    /// - Permission denied (user needs the `dialout` group)
    /// - A line setting is not supported (unknown baud rate, data bits)
    #[instrument(skip(device), fields(device = %device.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(device: P, settings: SerialSettings) -> Result<Self> {
        let path = device.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                PrintboxError::Transport(format!("Failed to open {}: {}", path.display(), e))
            })?;

        configure_tty(file.as_raw_fd(), &settings)?;
        info!(baud = settings.baud_rate, "serial port opened");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MS),
        })
    }

    /// Set the chunk size for large writes.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    /// Set the delay between chunks.
    pub fn set_chunk_delay(&mut self, delay: Duration) {
        self.chunk_delay = delay;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        if data.len() <= self.chunk_size {
            self.file
                .write_all(data)
                .map_err(|e| PrintboxError::Transport(format!("Write failed: {}", e)))?;
        } else {
            for chunk in data.chunks(self.chunk_size) {
                self.file
                    .write_all(chunk)
                    .map_err(|e| PrintboxError::Transport(format!("Write failed: {}", e)))?;

                if !self.chunk_delay.is_zero() {
                    thread::sleep(self.chunk_delay);
                }
            }
        }

        self.file
            .flush()
            .map_err(|e| PrintboxError::Transport(format!("Flush failed: {}", e)))
    }

    fn query(&mut self, request: &[u8]) -> Result<u8> {
        // Stale bytes in the input queue would be mistaken for the answer.
        discard_input(self.file.as_raw_fd());

        self.write_all(request)?;

        let mut response = [0u8; 1];
        let read = self
            .file
            .read(&mut response)
            .map_err(|e| PrintboxError::Transport(format!("Status read failed: {}", e)))?;
        if read == 0 {
            return Err(PrintboxError::Transport("status query timed out".into()));
        }

        debug!(request = ?request, response = response[0], "status query");
        Ok(response[0])
    }
}

fn baud_constant(baud_rate: u32) -> Result<libc::speed_t> {
    let speed = match baud_rate {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        other => {
            return Err(PrintboxError::Config(format!(
                "unsupported baud rate {}",
                other
            )));
        }
    };
    Ok(speed)
}

fn size_flag(bytesize: u8) -> Result<libc::tcflag_t> {
    match bytesize {
        5 => Ok(libc::CS5),
        6 => Ok(libc::CS6),
        7 => Ok(libc::CS7),
        8 => Ok(libc::CS8),
        other => Err(PrintboxError::Config(format!(
            "unsupported data bits {}",
            other
        ))),
    }
}

/// `VTIME` counts tenths of a second and saturates at 25.5 s.
fn vtime(timeout: Duration) -> libc::cc_t {
    let tenths = timeout.as_millis().div_ceil(100);
    tenths.min(u8::MAX as u128) as libc::cc_t
}

/// Configure a file descriptor for raw serial communication.
///
/// IXON/IXOFF/IXANY must be off: 0x11 (XON) and 0x13 (XOFF) appear in
/// raster data.
fn configure_tty(fd: i32, settings: &SerialSettings) -> Result<()> {
    use std::mem::MaybeUninit;

    let speed = baud_constant(settings.baud_rate)?;
    let size = size_flag(settings.bytesize)?;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(PrintboxError::Transport(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);

    termios.c_oflag &= !libc::OPOST;

    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);

    termios.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::PARODD | libc::CSTOPB);
    termios.c_cflag |= size | libc::CLOCAL | libc::CREAD;
    match settings.parity {
        Parity::None => {}
        Parity::Even => termios.c_cflag |= libc::PARENB,
        Parity::Odd => termios.c_cflag |= libc::PARENB | libc::PARODD,
    }
    if settings.stopbits >= 2 {
        termios.c_cflag |= libc::CSTOPB;
    }

    termios.c_cc[libc::VMIN] = 0;
    termios.c_cc[libc::VTIME] = vtime(settings.timeout);

    let result = unsafe {
        libc::cfsetispeed(&mut termios, speed) | libc::cfsetospeed(&mut termios, speed)
    };
    if result != 0 {
        return Err(PrintboxError::Transport(format!(
            "cfsetspeed failed: {}",
            io::Error::last_os_error()
        )));
    }

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(PrintboxError::Transport(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

fn discard_input(fd: i32) {
    unsafe {
        libc::tcflush(fd, libc::TCIFLUSH);
    }
}

// ============================================================================
// TESTS
// ============================================================================
