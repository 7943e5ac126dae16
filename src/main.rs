//! # Printbox CLI
//!
//! Command-line producer for the print queue.
//!
//! ## Usage
//!
//! ```bash
//! # Print a line of text
//! printbox text "Hello"
//!
//! # Styled text with a header line
//! printbox text "Hello world" --span bold:0:5 --span code:6:5 --user alice
//!
//! # QR code
//! printbox qr "https://example.com"
//!
//! # Photo (the file is left in place)
//! printbox image photo.jpg
//!
//! # Show the device calls without touching hardware
//! printbox --dry-run text "Hello"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use printbox::{
    DeliveryQueue, PrintTask, PrintboxError, RenderingEngine,
    config::Config,
    device::{Device, EscPosDevice, RecordingDevice},
    queue::{RetryPolicy, TokioDelay},
    render::engine::RenderSettings,
    segment::{Span, segment},
    task::{HeaderInfo, TransientImage},
    transport::{MockTransport, SerialSettings, SerialTransport},
};

/// Printbox - Serial thermal printer queue
#[derive(Parser, Debug)]
#[command(name = "printbox")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serial device path (overrides the configuration)
    #[arg(long, global = true)]
    device: Option<PathBuf>,

    /// Print into an in-memory transport
    #[arg(long, global = true)]
    mock: bool,

    /// List device calls instead of printing
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print text, optionally styled
    Text {
        text: String,

        /// Style span as kind:offset:length (UTF-16 units), repeatable
        #[arg(long = "span", value_parser = parse_span)]
        spans: Vec<Span>,

        /// Print a header line for this user
        #[arg(long)]
        user: Option<String>,
    },

    /// Print a QR code
    Qr {
        data: String,

        #[arg(long)]
        user: Option<String>,
    },

    /// Print an image file
    Image {
        path: PathBuf,

        #[arg(long)]
        user: Option<String>,
    },
}

fn parse_span(value: &str) -> Result<Span, String> {
    let mut parts = value.splitn(3, ':');
    let (Some(kind), Some(offset), Some(length)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected kind:offset:length, got '{}'", value));
    };
    let offset = offset
        .parse()
        .map_err(|e| format!("bad offset '{}': {}", offset, e))?;
    let length = length
        .parse()
        .map_err(|e| format!("bad length '{}': {}", length, e))?;
    Ok(Span::new(offset, length, kind))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), PrintboxError> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(device) = cli.device {
        config.device.path = device;
    }
    if cli.mock {
        config.device.mock = true;
    }

    let task = build_task(cli.command, config.formatting);
    let settings = RenderSettings::from_config(&config)?;

    if cli.dry_run {
        let recorder = RecordingDevice::new();
        let engine = RenderingEngine::new(recorder.clone(), settings)?;
        drain(engine, &config, task).await;
        for call in recorder.calls() {
            println!("{:?}", call);
        }
        return Ok(());
    }

    if config.device.mock {
        let transport = MockTransport::new();
        let device = EscPosDevice::new(transport.clone(), config.profile()?, config.codepage.encoder()?);
        let engine = RenderingEngine::new(device, settings)?;
        drain(engine, &config, task).await;
        println!("{} bytes written to mock transport", transport.written().len());
        return Ok(());
    }

    let transport = SerialTransport::open(&config.device.path, SerialSettings::from(&config.device))?;
    let device = EscPosDevice::new(transport, config.profile()?, config.codepage.encoder()?);
    let engine = RenderingEngine::new(device, settings)?;
    drain(engine, &config, task).await;
    Ok(())
}

fn build_task(command: Commands, formatting: bool) -> PrintTask {
    let (task, user) = match command {
        Commands::Text { text, spans, user } => {
            let task = if formatting && !spans.is_empty() {
                // empty text has no segments and prints as plain text
                PrintTask::segments(segment(&text, &spans)).unwrap_or_else(|| PrintTask::text(text))
            } else {
                PrintTask::text(text)
            };
            (task, user)
        }
        Commands::Qr { data, user } => (PrintTask::qr(data), user),
        // user files are never deleted
        Commands::Image { path, user } => (PrintTask::image(TransientImage::borrowed(path)), user),
    };
    match user {
        Some(user) => task.with_header(HeaderInfo::now(user)),
        None => task,
    }
}

async fn drain<D: Device + 'static>(engine: RenderingEngine<D>, config: &Config, task: PrintTask) {
    let (queue, consumer) = DeliveryQueue::new(engine, RetryPolicy::from(&config.retry), TokioDelay);
    queue.enqueue(task);
    drop(queue);
    consumer.run().await;
    info!("done");
}
