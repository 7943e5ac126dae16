//! # Printbox - Serial Thermal Printer Queue
//!
//! Printbox takes print jobs (plain text, styled text, QR payloads, photos)
//! from any number of producers and prints them one at a time on an ESC/POS
//! thermal printer attached to a serial port. It provides:
//!
//! - **Segmentation**: UTF-16 style spans to printable styled segments
//! - **Rendering**: header, body, cut; image pipeline and software QR
//! - **Queue**: FIFO delivery with bounded retry and status queries
//! - **Transport**: raw-mode serial TTY, plus an in-memory mock
//!
//! ## Quick Start
//!
//! ```no_run
//! use printbox::{
//!     DeliveryQueue, PrintTask, RenderingEngine,
//!     config::Config,
//!     device::EscPosDevice,
//!     queue::{RetryPolicy, TokioDelay},
//!     render::engine::RenderSettings,
//!     transport::{SerialSettings, SerialTransport},
//! };
//!
//! # async fn demo() -> Result<(), printbox::PrintboxError> {
//! let config = Config::default();
//! let transport = SerialTransport::open(
//!     &config.device.path,
//!     SerialSettings::from(&config.device),
//! )?;
//! let device = EscPosDevice::new(transport, config.profile()?, config.codepage.encoder()?);
//! let engine = RenderingEngine::new(device, RenderSettings::from_config(&config)?)?;
//!
//! let (queue, consumer) =
//!     DeliveryQueue::new(engine, RetryPolicy::from(&config.retry), TokioDelay);
//! let worker = tokio::spawn(consumer.run());
//!
//! queue.enqueue(PrintTask::text("Hello from printbox"));
//! queue.enqueue(PrintTask::qr("https://example.com"));
//!
//! drop(queue);
//! worker.await.ok();
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`segment`] | Style span segmentation |
//! | [`task`] | Print task data model |
//! | [`render`] | Rendering engine, image pipeline, QR, dithering |
//! | [`queue`] | Delivery queue and consumer |
//! | [`device`] | Command-level device API |
//! | [`protocol`] | ESC/POS command builders |
//! | [`encoding`] | Single-byte code pages |
//! | [`transport`] | Communication backends |
//! | [`printer`] | Hardware profiles |
//! | [`config`] | JSON configuration |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! - Cashino CSN-A2 (58mm paper, 384 dots)
//! - Rongta RP326 (80mm paper, 576 dots)
//!
//! Other ESC/POS printers should work with a matching profile.

pub mod config;
pub mod device;
pub mod encoding;
pub mod error;
pub mod printer;
pub mod protocol;
pub mod queue;
pub mod render;
pub mod segment;
pub mod task;
pub mod transport;

// Re-exports for convenience
pub use error::PrintboxError;
pub use printer::PrinterConfig;
pub use queue::DeliveryQueue;
pub use render::RenderingEngine;
pub use task::PrintTask;
