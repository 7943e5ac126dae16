//! # Pipeline Tests
//!
//! End-to-end checks of the bytes that reach the transport: engine over
//! [`EscPosDevice`] over [`MockTransport`], optionally driven by the queue.

use std::time::Duration;

use pretty_assertions::assert_eq;
use printbox::config::Config;
use printbox::device::{EscPosDevice, PaperStatus, PrinterStatus};
use printbox::encoding::Codepage;
use printbox::queue::{DeliveryQueue, Outcome, RetryPolicy, TokioDelay};
use printbox::render::engine::RenderSettings;
use printbox::segment::{Span, segment};
use printbox::task::{HeaderInfo, TransientImage};
use printbox::transport::MockTransport;
use printbox::{PrintTask, PrinterConfig, RenderingEngine};

/// `ESC @`, `ESC t 6`
const REINIT: [u8; 5] = [0x1B, 0x40, 0x1B, 0x74, 6];
/// `GS V 66 0`
const PARTIAL_CUT: [u8; 4] = [0x1D, 0x56, 0x42, 0];

fn engine_for(
    profile: &str,
) -> (RenderingEngine<EscPosDevice<MockTransport>>, MockTransport) {
    let mut config = Config::default();
    config.device.profile = profile.into();
    let transport = MockTransport::new();
    let device = EscPosDevice::new(
        transport.clone(),
        config.profile().unwrap(),
        Codepage::for_label("cp1251").unwrap(),
    );
    let engine = RenderingEngine::new(device, RenderSettings::from_config(&config).unwrap()).unwrap();
    (engine, transport)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

#[test]
fn session_starts_with_init_and_codepage() {
    let (_engine, transport) = engine_for("rp326");
    assert_eq!(&transport.written()[..5], &REINIT);
}

#[test]
fn cyrillic_text_is_encoded_in_cp1251() {
    let (mut engine, transport) = engine_for("rp326");
    transport.clear();

    engine.render(&PrintTask::text("Привет")).unwrap();

    let bytes = transport.written();
    let encoded = [0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2, 0x0A];
    assert!(find(&bytes, &encoded).is_some());
    assert!(bytes.ends_with(&PARTIAL_CUT));
}

#[test]
fn qr_goes_through_raster_and_reinitializes() {
    let (mut engine, transport) = engine_for("rp326");
    transport.clear();

    engine.render(&PrintTask::qr("Привет")).unwrap();
    let bytes = transport.written();

    // ESC * 33 column stripes, never the native GS ( k symbol commands
    let raster = find(&bytes, &[0x1B, 0x2A, 33]).expect("no column raster");
    assert!(find(&bytes, &[0x1D, 0x28, 0x6B]).is_none());

    // ESC 2 closes the raster, then a full reinit, then the cut
    let raster_end = rfind(&bytes, &[0x1B, 0x32]).unwrap();
    let reinit = rfind(&bytes, &REINIT).unwrap();
    let cut = rfind(&bytes, &PARTIAL_CUT).unwrap();
    assert!(raster < raster_end);
    assert!(raster_end < reinit);
    assert!(reinit < cut);

    // The next task starts from plain text mode
    transport.clear();
    engine.render(&PrintTask::text("after")).unwrap();
    let bytes = transport.written();
    assert!(find(&bytes, b"after\n").is_some());
    assert!(find(&bytes, &REINIT).is_none());
}

#[test]
fn styled_segments_reset_to_baseline() {
    let (mut engine, transport) = engine_for("rp326");
    transport.clear();

    let segments = segment("Hello world", &[Span::new(0, 5, "bold")]);
    engine.render(&PrintTask::segments(segments).unwrap()).unwrap();
    let bytes = transport.written();

    let bold_on = find(&bytes, &[0x1B, 0x45, 1]).unwrap();
    let hello = find(&bytes, b"Hello").unwrap();
    let bold_off = find(&bytes[hello..], &[0x1B, 0x45, 0]).map(|i| i + hello).unwrap();
    let world = find(&bytes, b" world").unwrap();
    assert!(bold_on < hello);
    assert!(hello < bold_off);
    assert!(bold_off < world);
}

#[test]
fn header_uses_compact_font() {
    let (mut engine, transport) = engine_for("rp326");
    transport.clear();

    let task = PrintTask::text("body").with_header(HeaderInfo::new("2024-01-01 10:00", "alice"));
    engine.render(&task).unwrap();
    let bytes = transport.written();

    let font_b = find(&bytes, &[0x1B, 0x4D, 1]).unwrap();
    let header = find(&bytes, b"2024-01-01 10:00 alice\n").unwrap();
    let rule = find(&bytes, &[b'-'; 42]).unwrap();
    let body = find(&bytes, b"body\n").unwrap();
    assert!(font_b < header);
    assert!(header < rule);
    assert!(rule < body);
}

#[test]
fn narrow_profile_skips_density_and_cuts_bare() {
    let (mut engine, transport) = engine_for("csn-a2");
    transport.clear();

    engine.render(&PrintTask::text("hi")).unwrap();
    let bytes = transport.written();

    assert!(find(&bytes, &[0x1D, 0x28, 0x4B]).is_none());
    assert!(bytes.ends_with(&[0x1B, 0x64, 3, 0x1D, 0x56, 0]));
}

#[test]
fn profiles_have_expected_widths() {
    assert_eq!(PrinterConfig::CSN_A2.width_dots, 384);
    assert_eq!(PrinterConfig::RP326.width_dots, 576);
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn queue_retries_transport_failures() {
    let (engine, transport) = engine_for("rp326");
    transport.clear();
    let (_queue, mut consumer) = DeliveryQueue::new(engine, fast_retry(), TokioDelay);

    transport.fail_next_writes(2);
    let report = consumer.deliver(PrintTask::text("stubborn")).await;

    assert_eq!(report.attempts, 3);
    assert_eq!(report.outcome, Outcome::Printed);
    assert_eq!(count(&transport.written(), b"stubborn\n"), 1);
}

#[tokio::test]
async fn queue_drops_after_three_failures() {
    let (engine, transport) = engine_for("rp326");
    transport.clear();
    let (_queue, mut consumer) = DeliveryQueue::new(engine, fast_retry(), TokioDelay);

    transport.fail_next_writes(3);
    let report = consumer.deliver(PrintTask::text("x")).await;
    assert_eq!(report.attempts, 3);
    assert_eq!(report.outcome, Outcome::Dropped);

    // The consumer keeps going with the next task
    let report = consumer.deliver(PrintTask::text("next")).await;
    assert_eq!(report.outcome, Outcome::Printed);
}

#[tokio::test]
async fn queue_reports_mock_status() {
    let (engine, transport) = engine_for("rp326");
    let (queue, _consumer) = DeliveryQueue::new(engine, fast_retry(), TokioDelay);

    let status = queue.status().await;
    assert!(status.online);
    assert_eq!(status.paper, PaperStatus::Adequate);

    transport.set_status(Some(0x12 | 0x08), Some(0x12 | 0x60));
    let status = queue.status().await;
    assert!(!status.online);
    assert_eq!(status.paper, PaperStatus::Empty);
}

#[test]
fn unanswered_online_query_reports_unreachable() {
    let (mut engine, transport) = engine_for("rp326");
    transport.set_status(None, Some(0x12));

    let status = engine.status();
    assert_eq!(status, PrinterStatus::UNREACHABLE);
    assert!(!status.online);
    assert_eq!(status.paper, PaperStatus::Unknown);
}

#[test]
fn unanswered_paper_query_leaves_paper_unknown() {
    let (mut engine, transport) = engine_for("rp326");
    transport.set_status(Some(0x12), None);

    let status = engine.status();
    assert!(status.online);
    assert_eq!(status.paper, PaperStatus::Unknown);
}

#[tokio::test]
async fn queue_status_survives_a_silent_printer() {
    let (engine, transport) = engine_for("rp326");
    let (queue, _consumer) = DeliveryQueue::new(engine, fast_retry(), TokioDelay);

    transport.set_status(None, None);
    assert_eq!(queue.status().await, PrinterStatus::UNREACHABLE);

    transport.set_status(Some(0x12), Some(0x12));
    assert_eq!(
        queue.status().await,
        PrinterStatus {
            online: true,
            paper: PaperStatus::Adequate
        }
    );
}

#[tokio::test]
async fn landscape_photo_prints_in_fragments_and_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.png");
    image::RgbaImage::from_pixel(200, 100, image::Rgba([40, 40, 40, 255]))
        .save(&path)
        .unwrap();

    let (engine, transport) = engine_for("rp326");
    transport.clear();
    let (queue, consumer) = DeliveryQueue::new(engine, fast_retry(), TokioDelay);

    queue.enqueue(PrintTask::image(TransientImage::new(&path)));
    drop(queue);
    consumer.run().await;

    let bytes = transport.written();
    // rotated to 100x200, resized to 576x1152, split at 960 rows
    assert!(find(&bytes, &[0x1D, 0x76, 0x30, 0, 72, 0, 0xC0, 0x03]).is_some());
    assert!(find(&bytes, &[0x1D, 0x76, 0x30, 0, 72, 0, 0xC0, 0x00]).is_some());
    assert!(rfind(&bytes, &REINIT).unwrap() < rfind(&bytes, &PARTIAL_CUT).unwrap());
    assert!(!path.exists());
}
