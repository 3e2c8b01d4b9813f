//! Global rate-limited dispatch queue.
//!
//! Every outbound provider request goes through one FIFO queue drained by a
//! single worker task. Before each dispatch the worker waits until at least
//! `min_interval` has passed since the previous dispatch, so the provider
//! never sees more than one request per interval from this process no matter
//! how many keys or callers are waiting.
//!
//! # Architecture
//!
//! ```text
//! enqueue(task) ──► unbounded FIFO ──► worker ──► wait(min_interval - elapsed)
//!                                        │
//!                                        └──► run task ──► oneshot result
//! ```
//!
//! The dispatch clock is `tokio::time::Instant`, so tests drive pacing with
//! Tokio's paused time instead of real sleeps.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Minimum spacing between dispatches required by the public Nominatim
/// usage policy.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1000);

/// Configuration for the scheduler.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Minimum time between two dispatches.
    pub min_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

type Job = BoxFuture<'static, ()>;

/// Counters shared between the handle and the worker.
#[derive(Debug, Default)]
struct QueueCounters {
    queued: AtomicUsize,
    dispatched: AtomicU64,
}

/// Handle to the dispatch queue.
///
/// Dropping the handle closes the queue; tasks already enqueued still run.
pub struct Scheduler {
    queue: mpsc::UnboundedSender<Job>,
    worker: JoinHandle<()>,
    counters: Arc<QueueCounters>,
}

impl Scheduler {
    /// Spawns the worker task and returns the queue handle.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: SchedulerConfig) -> Self {
        let (queue, jobs) = mpsc::unbounded_channel();
        let counters = Arc::new(QueueCounters::default());
        let worker = tokio::spawn(run_worker(config, jobs, Arc::clone(&counters)));

        Self {
            queue,
            worker,
            counters,
        }
    }

    /// Appends a task to the queue.
    ///
    /// Tasks run one at a time in submission order. The returned receiver
    /// yields the task's output; it errors only if the task panicked or the
    /// worker is gone.
    pub fn enqueue<F, T>(&self, task: F) -> oneshot::Receiver<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let job = async move {
            let _ = result_tx.send(task.await);
        }
        .boxed();

        self.counters.queued.fetch_add(1, Ordering::Relaxed);
        if self.queue.send(job).is_err() {
            self.counters.queued.fetch_sub(1, Ordering::Relaxed);
            warn!("Scheduler worker has stopped; task dropped");
        }

        result_rx
    }

    /// Number of tasks waiting to be dispatched.
    pub fn queued(&self) -> usize {
        self.counters.queued.load(Ordering::Relaxed)
    }

    /// Number of tasks dispatched so far.
    pub fn dispatched(&self) -> u64 {
        self.counters.dispatched.load(Ordering::Relaxed)
    }

    /// Closes the queue and waits for every enqueued task to finish.
    pub async fn shutdown(self) {
        let Self { queue, worker, .. } = self;
        drop(queue);
        if let Err(e) = worker.await {
            warn!(error = %e, "Scheduler worker ended abnormally");
        }
    }
}

async fn run_worker(
    config: SchedulerConfig,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    counters: Arc<QueueCounters>,
) {
    debug!(
        min_interval_ms = config.min_interval.as_millis() as u64,
        "Scheduler worker starting"
    );

    let mut last_dispatch: Option<Instant> = None;

    while let Some(job) = jobs.recv().await {
        if let Some(last) = last_dispatch {
            let elapsed = last.elapsed();
            if elapsed < config.min_interval {
                let wait = config.min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "Pacing provider request");
                tokio::time::sleep(wait).await;
            }
        }

        last_dispatch = Some(Instant::now());
        counters.queued.fetch_sub(1, Ordering::Relaxed);
        counters.dispatched.fetch_add(1, Ordering::Relaxed);

        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
            warn!("Scheduled task panicked; continuing with next task");
        }
    }

    debug!("Scheduler queue closed, worker exiting");
}
