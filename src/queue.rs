//! # Delivery Queue
//!
//! Producers push [`PrintTask`]s from anywhere; one [`Consumer`] prints them
//! in arrival order.
//!
//! ```text
//! producer ─┐
//! producer ─┼─► unbounded channel ─► Consumer ─► spawn_blocking ─┬─► Rasterizer::prepare
//! producer ─┘                          │                         └─► Renderer::emit ─► device
//!                                      │  retry: up to N attempts, fixed delay
//!                                      └─ status(): try_lock, else last known status
//! ```
//!
//! ## Guarantees
//!
//! - `enqueue` never blocks and never rejects while the consumer is alive
//! - tasks print one at a time, in FIFO order
//! - device work and image decoding run on the blocking pool, never on the
//!   async runtime
//! - images are decoded before the device is locked
//! - `status()` returns within [`STATUS_TIMEOUT`] even while a task is
//!   printing
//! - a failing task never stops the consumer; after the last attempt it is
//!   logged and dropped
//!
//! ## Example
//!
//! ```
//! use printbox::device::RecordingDevice;
//! use printbox::queue::{DeliveryQueue, RetryPolicy, TokioDelay};
//! use printbox::render::engine::{RenderSettings, RenderingEngine};
//! use printbox::task::PrintTask;
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let recorder = RecordingDevice::new();
//! let engine = RenderingEngine::new(recorder.clone(), RenderSettings::default()).unwrap();
//! let (queue, consumer) = DeliveryQueue::new(engine, RetryPolicy::default(), TokioDelay);
//!
//! queue.enqueue(PrintTask::text("hello"));
//! drop(queue);
//! consumer.run().await;
//! # });
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::RetryConfig;
use crate::device::{Device, PrinterStatus};
use crate::error::Result;
use crate::render::{Artwork, Rasterizer, RenderingEngine};
use crate::task::PrintTask;

/// Longest [`DeliveryQueue::status`] waits for an answer.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(2);

/// Something that can print tasks and report printer health.
///
/// Calls are blocking; the queue runs them on the blocking thread pool.
/// Artwork comes from [`Renderer::rasterizer`] and is built without the
/// renderer's lock held.
pub trait Renderer: Send + 'static {
    fn rasterizer(&self) -> Rasterizer;

    fn emit(&mut self, task: &PrintTask, artwork: &Artwork) -> Result<()>;

    fn status(&mut self) -> PrinterStatus;
}

impl<D: Device + 'static> Renderer for RenderingEngine<D> {
    fn rasterizer(&self) -> Rasterizer {
        RenderingEngine::rasterizer(self)
    }

    fn emit(&mut self, task: &PrintTask, artwork: &Artwork) -> Result<()> {
        RenderingEngine::emit(self, task, artwork)
    }

    fn status(&mut self) -> PrinterStatus {
        RenderingEngine::status(self)
    }
}

/// Pause between attempts.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How often and how patiently a task is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Printed,
    /// Every attempt failed; the task is gone
    Dropped,
}

/// What happened to one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub attempts: u32,
    pub outcome: Outcome,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Producer handle. Cheap to clone; the consumer stops once every handle
/// is dropped and the backlog is printed.
pub struct DeliveryQueue<R: Renderer> {
    sender: mpsc::UnboundedSender<PrintTask>,
    renderer: Arc<Mutex<R>>,
    last_status: Arc<Mutex<Option<PrinterStatus>>>,
}

impl<R: Renderer> Clone for DeliveryQueue<R> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            renderer: Arc::clone(&self.renderer),
            last_status: Arc::clone(&self.last_status),
        }
    }
}

impl<R: Renderer> DeliveryQueue<R> {
    pub fn new(
        renderer: R,
        policy: RetryPolicy,
        delay: impl Delay + 'static,
    ) -> (Self, Consumer<R>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let rasterizer = renderer.rasterizer();
        let renderer = Arc::new(Mutex::new(renderer));
        let queue = Self {
            sender,
            renderer: Arc::clone(&renderer),
            last_status: Arc::new(Mutex::new(None)),
        };
        let consumer = Consumer {
            receiver,
            renderer,
            rasterizer,
            policy,
            delay: Arc::new(delay),
        };
        (queue, consumer)
    }

    /// Append a task. Returns immediately.
    pub fn enqueue(&self, task: PrintTask) {
        debug!(kind = task.kind(), preview = %task.preview(), "task queued");
        if let Err(mpsc::error::SendError(task)) = self.sender.send(task) {
            error!(
                kind = task.kind(),
                preview = %task.preview(),
                "consumer stopped, task discarded"
            );
        }
    }

    /// Ask the printer for its health.
    ///
    /// Never waits behind a task that is printing: while the device is
    /// busy this returns the last status read from it, or
    /// [`PrinterStatus::UNREACHABLE`] if there is none. A query that takes
    /// longer than [`STATUS_TIMEOUT`] also reports unreachable.
    pub async fn status(&self) -> PrinterStatus {
        let renderer = Arc::clone(&self.renderer);
        let query = tokio::task::spawn_blocking(move || match renderer.try_lock() {
            Ok(mut guard) => Some(guard.status()),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner().status()),
            Err(TryLockError::WouldBlock) => None,
        });

        match tokio::time::timeout(STATUS_TIMEOUT, query).await {
            Ok(Ok(Some(status))) => {
                *lock(&self.last_status) = Some(status);
                status
            }
            Ok(Ok(None)) => {
                let cached = *lock(&self.last_status);
                debug!(?cached, "printer busy, reporting last known status");
                cached.unwrap_or(PrinterStatus::UNREACHABLE)
            }
            Ok(Err(e)) => {
                error!(error = %e, "status query panicked");
                PrinterStatus::UNREACHABLE
            }
            Err(_) => {
                warn!(timeout = ?STATUS_TIMEOUT, "status query timed out");
                PrinterStatus::UNREACHABLE
            }
        }
    }
}

/// The single consumer. Obtain it from [`DeliveryQueue::new`] and drive it
/// with [`Consumer::run`].
pub struct Consumer<R: Renderer> {
    receiver: mpsc::UnboundedReceiver<PrintTask>,
    renderer: Arc<Mutex<R>>,
    rasterizer: Rasterizer,
    policy: RetryPolicy,
    delay: Arc<dyn Delay>,
}

impl<R: Renderer> Consumer<R> {
    /// Print tasks until every producer handle is dropped.
    pub async fn run(mut self) {
        info!("print queue started");
        while let Some(task) = self.receiver.recv().await {
            self.deliver(task).await;
        }
        info!("print queue drained");
    }

    /// Print one task with retries. The task is dropped afterwards either
    /// way, which removes any transient image it owns.
    pub async fn deliver(&mut self, task: PrintTask) -> DeliveryReport {
        let kind = task.kind();
        let preview = task.preview();
        let mut task = task;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let renderer = Arc::clone(&self.renderer);
            let rasterizer = self.rasterizer.clone();
            let joined = tokio::task::spawn_blocking(move || {
                let result = rasterizer
                    .prepare(&task)
                    .and_then(|artwork| lock(&renderer).emit(&task, &artwork));
                (task, result)
            })
            .await;

            let result = match joined {
                Ok((returned, result)) => {
                    task = returned;
                    result
                }
                Err(e) => {
                    error!(kind, %preview, error = %e, "render worker panicked, task dropped");
                    return DeliveryReport {
                        attempts: attempt,
                        outcome: Outcome::Dropped,
                    };
                }
            };

            match result {
                Ok(()) => {
                    info!(kind, %preview, attempt, "task delivered");
                    return DeliveryReport {
                        attempts: attempt,
                        outcome: Outcome::Printed,
                    };
                }
                Err(e) if attempt < self.policy.max_attempts => {
                    warn!(kind, %preview, attempt, error = %e, "print attempt failed, retrying");
                    self.delay.wait(self.policy.delay).await;
                }
                Err(e) => {
                    error!(kind, %preview, attempts = attempt, error = %e, "print failed, task dropped");
                    return DeliveryReport {
                        attempts: attempt,
                        outcome: Outcome::Dropped,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::PaperStatus;
    use crate::error::PrintboxError;
    use crate::render::engine::RenderSettings;
    use crate::task::TransientImage;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::mpsc as sync_mpsc;

    /// Fails the first `failures` renders, then succeeds.
    struct FlakyRenderer {
        failures: u32,
        calls: Arc<AtomicU32>,
        printed: Arc<Mutex<Vec<String>>>,
    }

    impl FlakyRenderer {
        fn new(failures: u32) -> (Self, Arc<AtomicU32>, Arc<Mutex<Vec<String>>>) {
            let calls = Arc::new(AtomicU32::new(0));
            let printed = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    failures,
                    calls: Arc::clone(&calls),
                    printed: Arc::clone(&printed),
                },
                calls,
                printed,
            )
        }
    }

    impl Renderer for FlakyRenderer {
        fn rasterizer(&self) -> Rasterizer {
            Rasterizer::new(RenderSettings::default())
        }

        fn emit(&mut self, task: &PrintTask, artwork: &Artwork) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let crate::task::Payload::Image(image) = &task.payload {
                assert!(image.path().exists(), "image removed before the last attempt");
                assert!(matches!(artwork, Artwork::Image(_)));
            }
            if call < self.failures {
                return Err(PrintboxError::Transport("paper jam".into()));
            }
            self.printed.lock().unwrap().push(task.preview());
            Ok(())
        }

        fn status(&mut self) -> PrinterStatus {
            PrinterStatus {
                online: true,
                paper: PaperStatus::NearEnd,
            }
        }
    }

    /// Blocks inside `emit` until released, holding the device lock.
    struct StalledRenderer {
        started: sync_mpsc::Sender<()>,
        release: sync_mpsc::Receiver<()>,
    }

    impl StalledRenderer {
        fn new() -> (Self, sync_mpsc::Receiver<()>, sync_mpsc::Sender<()>) {
            let (started, started_rx) = sync_mpsc::channel();
            let (release_tx, release) = sync_mpsc::channel();
            (Self { started, release }, started_rx, release_tx)
        }
    }

    impl Renderer for StalledRenderer {
        fn rasterizer(&self) -> Rasterizer {
            Rasterizer::new(RenderSettings::default())
        }

        fn emit(&mut self, _task: &PrintTask, _artwork: &Artwork) -> Result<()> {
            let _ = self.started.send(());
            let _ = self.release.recv();
            Ok(())
        }

        fn status(&mut self) -> PrinterStatus {
            PrinterStatus {
                online: true,
                paper: PaperStatus::Adequate,
            }
        }
    }

    async fn wait_until_started(started: sync_mpsc::Receiver<()>) {
        tokio::task::spawn_blocking(move || started.recv())
            .await
            .unwrap()
            .unwrap();
    }

    #[derive(Default, Clone)]
    struct CountingDelay {
        waits: Arc<Mutex<Vec<Duration>>>,
    }

    #[async_trait]
    impl Delay for CountingDelay {
        async fn wait(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    #[tokio::test]
    async fn test_two_failures_then_success() {
        let (renderer, calls, _) = FlakyRenderer::new(2);
        let delay = CountingDelay::default();
        let (_queue, mut consumer) = DeliveryQueue::new(renderer, RetryPolicy::default(), delay.clone());

        let report = consumer.deliver(PrintTask::text("retry me")).await;

        assert_eq!(
            report,
            DeliveryReport {
                attempts: 3,
                outcome: Outcome::Printed
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*delay.waits.lock().unwrap(), vec![Duration::from_millis(500); 2]);
    }

    #[tokio::test]
    async fn test_three_failures_drop_task() {
        let (renderer, calls, printed) = FlakyRenderer::new(u32::MAX);
        let delay = CountingDelay::default();
        let (_queue, mut consumer) = DeliveryQueue::new(renderer, RetryPolicy::default(), delay.clone());

        let report = consumer.deliver(PrintTask::text("doomed")).await;

        assert_eq!(
            report,
            DeliveryReport {
                attempts: 3,
                outcome: Outcome::Dropped
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(delay.waits.lock().unwrap().len(), 2);
        assert!(printed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fifo_and_failure_isolation() {
        // first task fails all three attempts, the rest print
        let (renderer, _, printed) = FlakyRenderer::new(3);
        let (queue, consumer) = DeliveryQueue::new(renderer, RetryPolicy::default(), CountingDelay::default());

        queue.enqueue(PrintTask::text("lost"));
        queue.enqueue(PrintTask::text("one"));
        queue.enqueue(PrintTask::qr("two"));
        queue.clone().enqueue(PrintTask::text("three"));
        drop(queue);

        consumer.run().await;
        assert_eq!(*printed.lock().unwrap(), vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_image_survives_retries_and_is_removed_after() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        ::image::RgbaImage::from_pixel(8, 8, ::image::Rgba([0, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let (renderer, calls, _) = FlakyRenderer::new(u32::MAX);
        let (_queue, mut consumer) = DeliveryQueue::new(renderer, RetryPolicy::default(), CountingDelay::default());

        let report = consumer.deliver(PrintTask::image(TransientImage::new(&path))).await;
        assert_eq!(report.outcome, Outcome::Dropped);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_status_goes_through_renderer() {
        let (renderer, _, _) = FlakyRenderer::new(0);
        let (queue, _consumer) = DeliveryQueue::new(renderer, RetryPolicy::default(), TokioDelay);
        assert_eq!(
            queue.status().await,
            PrinterStatus {
                online: true,
                paper: PaperStatus::NearEnd
            }
        );
    }

    #[tokio::test]
    async fn test_unreadable_image_is_retried_then_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();

        let (renderer, calls, _) = FlakyRenderer::new(0);
        let delay = CountingDelay::default();
        let (_queue, mut consumer) = DeliveryQueue::new(renderer, RetryPolicy::default(), delay.clone());

        let report = consumer.deliver(PrintTask::image(TransientImage::new(&path))).await;
        assert_eq!(report.outcome, Outcome::Dropped);
        assert_eq!(report.attempts, 3);
        // decoding failed every time, the device was never reached
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(delay.waits.lock().unwrap().len(), 2);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_status_during_stalled_task_returns_last_known() {
        let (renderer, started, release) = StalledRenderer::new();
        let (queue, consumer) = DeliveryQueue::new(renderer, RetryPolicy::default(), CountingDelay::default());

        let idle = queue.status().await;
        assert_eq!(
            idle,
            PrinterStatus {
                online: true,
                paper: PaperStatus::Adequate
            }
        );

        let worker = tokio::spawn(consumer.run());
        queue.enqueue(PrintTask::text("stuck"));
        wait_until_started(started).await;

        let busy = tokio::time::timeout(Duration::from_secs(1), queue.status())
            .await
            .expect("status waited for the stalled task");
        assert_eq!(busy, idle);

        release.send(()).unwrap();
        drop(queue);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_status_during_stalled_task_without_history_is_unreachable() {
        let (renderer, started, release) = StalledRenderer::new();
        let (queue, consumer) = DeliveryQueue::new(renderer, RetryPolicy::default(), CountingDelay::default());

        let worker = tokio::spawn(consumer.run());
        queue.enqueue(PrintTask::text("stuck"));
        wait_until_started(started).await;

        let busy = tokio::time::timeout(Duration::from_secs(1), queue.status())
            .await
            .expect("status waited for the stalled task");
        assert_eq!(busy, PrinterStatus::UNREACHABLE);

        release.send(()).unwrap();
        drop(queue);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_enqueue_after_consumer_gone() {
        let (renderer, calls, _) = FlakyRenderer::new(0);
        let (queue, consumer) = DeliveryQueue::new(renderer, RetryPolicy::default(), TokioDelay);
        drop(consumer);
        queue.enqueue(PrintTask::text("nobody listens"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from(&RetryConfig {
            max_attempts: 5,
            delay_ms: 20,
        });
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_millis(20));
    }
}
