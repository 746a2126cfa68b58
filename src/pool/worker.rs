//! Worker thread implementation

use crate::core::{BoxedJob, PoolError, Result};
use crate::pool::spawner::ThreadSpawner;
use crate::queue::{JobQueue, PendingJobs};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

#[cfg(feature = "tracing")]
use crate::tracing::metrics::{self, JobOutcome};
#[cfg(feature = "tracing")]
use tracing::{debug, span, Level};

/// Statistics for a worker thread
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Total number of jobs that completed successfully
    pub jobs_processed: AtomicU64,
    /// Total number of jobs that returned an error
    pub jobs_failed: AtomicU64,
    /// Total number of jobs that panicked
    pub jobs_panicked: AtomicU64,
    /// Total time spent processing jobs (microseconds)
    pub total_processing_time_us: AtomicU64,
}

impl WorkerStats {
    /// Create new worker statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment jobs processed counter
    pub fn increment_processed(&self) {
        self.jobs_processed.fetch_add(1, Ordering::Release);
    }

    /// Increment jobs failed counter
    pub fn increment_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Release);
    }

    /// Increment jobs panicked counter
    pub fn increment_panicked(&self) {
        self.jobs_panicked.fetch_add(1, Ordering::Release);
    }

    /// Add processing time
    pub fn add_processing_time(&self, microseconds: u64) {
        self.total_processing_time_us
            .fetch_add(microseconds, Ordering::Relaxed);
    }

    /// Get total jobs processed
    pub fn get_jobs_processed(&self) -> u64 {
        self.jobs_processed.load(Ordering::Acquire)
    }

    /// Get total jobs failed
    pub fn get_jobs_failed(&self) -> u64 {
        self.jobs_failed.load(Ordering::Acquire)
    }

    /// Get total jobs panicked
    pub fn get_jobs_panicked(&self) -> u64 {
        self.jobs_panicked.load(Ordering::Acquire)
    }

    /// Get total jobs executed, whatever their outcome
    pub fn get_jobs_executed(&self) -> u64 {
        self.get_jobs_processed() + self.get_jobs_failed() + self.get_jobs_panicked()
    }

    /// Get average processing time per executed job in microseconds
    pub fn get_average_processing_time_us(&self) -> f64 {
        let total = self.total_processing_time_us.load(Ordering::Relaxed);
        let count = self.get_jobs_executed();
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }
}

/// Lifecycle of a worker thread.
///
/// `Starting → Waiting → Running → Waiting … → Stopping → Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum WorkerState {
    /// Thread launched, not yet waiting for work
    Starting = 0,
    /// Blocked on the queue until a job arrives or a stop is requested
    Waiting = 1,
    /// Executing a dequeued job outside the queue lock
    Running = 2,
    /// Stop observed; leaving the loop
    Stopping = 3,
    /// Thread function returned
    Stopped = 4,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Starting,
            1 => WorkerState::Waiting,
            2 => WorkerState::Running,
            3 => WorkerState::Stopping,
            _ => WorkerState::Stopped,
        }
    }
}

#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: WorkerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// Point-in-time view of one worker, suitable for export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerStatSnapshot {
    /// Worker ID
    pub worker_id: usize,
    /// State at the time of the snapshot
    pub state: WorkerState,
    /// Jobs that completed successfully
    pub jobs_processed: u64,
    /// Jobs that returned an error
    pub jobs_failed: u64,
    /// Jobs that panicked
    pub jobs_panicked: u64,
    /// Average processing time per executed job in microseconds
    pub average_processing_time_us: f64,
}

/// A worker thread that processes jobs from the pool's queue
///
/// The worker holds a handle to the queue, never to the pool. The pool owns
/// every `Worker` and joins it before the pool itself goes away.
#[derive(Debug)]
pub struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
    active: Arc<AtomicBool>,
    state: Arc<StateCell>,
    stats: Arc<WorkerStats>,
    queue: Arc<JobQueue>,
}

impl Worker {
    /// Create and start a new worker
    ///
    /// # Arguments
    ///
    /// * `id` - Unique identifier for this worker
    /// * `queue` - Queue shared with the pool and the other workers
    /// * `pending` - Counted down once per job this worker finishes
    /// * `builder` - Thread configuration (name, stack size)
    /// * `spawner` - Creates the OS thread
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ResourceExhausted`] if the thread cannot be created.
    pub fn spawn(
        id: usize,
        queue: Arc<JobQueue>,
        pending: Arc<PendingJobs>,
        builder: thread::Builder,
        spawner: &dyn ThreadSpawner,
    ) -> Result<Self> {
        let active = Arc::new(AtomicBool::new(true));
        let state = Arc::new(StateCell::new(WorkerState::Starting));
        let stats = Arc::new(WorkerStats::new());

        let body = {
            let queue = Arc::clone(&queue);
            let active = Arc::clone(&active);
            let state = Arc::clone(&state);
            let stats = Arc::clone(&stats);
            Box::new(move || Self::run(id, &queue, &pending, &active, &state, &stats))
        };

        let thread = spawner
            .spawn(id, builder, body)
            .map_err(|e| PoolError::spawn_failed(id, e))?;

        Ok(Self {
            id,
            thread: Some(thread),
            active,
            state,
            stats,
            queue,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get the worker's current lifecycle state
    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    /// Whether the worker has not yet been asked to stop
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Get worker statistics
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Take a snapshot of the worker's state and counters
    pub fn snapshot(&self) -> WorkerStatSnapshot {
        WorkerStatSnapshot {
            worker_id: self.id,
            state: self.state(),
            jobs_processed: self.stats.get_jobs_processed(),
            jobs_failed: self.stats.get_jobs_failed(),
            jobs_panicked: self.stats.get_jobs_panicked(),
            average_processing_time_us: self.stats.get_average_processing_time_us(),
        }
    }

    /// Clear the worker's stop flag.
    ///
    /// Does not wake the worker; follow with [`JobQueue::wake_all`] once
    /// every worker that should stop has been flagged.
    pub fn request_stop(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Join the worker thread
    ///
    /// Blocks until the thread has returned. The caller must have requested
    /// a stop and woken the queue first.
    pub fn join(mut self) -> Result<()> {
        self.join_thread()
    }

    fn join_thread(&mut self) -> Result<()> {
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|panic_info| PoolError::join(self.id, panic_message(&*panic_info)))?;
        }
        Ok(())
    }

    /// Main worker loop
    ///
    /// Stop is checked before each dequeue, so jobs still queued when the
    /// stop flag is cleared are left in the queue.
    fn run(
        id: usize,
        queue: &JobQueue,
        pending: &PendingJobs,
        active: &AtomicBool,
        state: &StateCell,
        stats: &WorkerStats,
    ) {
        #[cfg(feature = "tracing")]
        let worker_span = span!(Level::DEBUG, "worker", id = id);
        #[cfg(feature = "tracing")]
        let _guard = worker_span.enter();

        #[cfg(feature = "tracing")]
        debug!("worker started");
        #[cfg(not(feature = "tracing"))]
        log::debug!("worker {} started", id);

        state.set(WorkerState::Waiting);

        while let Some(job) = queue.pop_blocking(|| !active.load(Ordering::Acquire)) {
            state.set(WorkerState::Running);

            #[cfg(feature = "tracing")]
            metrics::worker_transition(id, WorkerState::Running);

            Self::execute_job(id, job, stats);
            pending.complete();

            #[cfg(feature = "tracing")]
            metrics::worker_transition(id, WorkerState::Waiting);

            state.set(WorkerState::Waiting);
        }

        state.set(WorkerState::Stopping);

        #[cfg(feature = "tracing")]
        debug!(
            jobs_processed = stats.get_jobs_processed(),
            jobs_failed = stats.get_jobs_failed(),
            jobs_panicked = stats.get_jobs_panicked(),
            "worker shutting down"
        );
        #[cfg(not(feature = "tracing"))]
        log::debug!(
            "worker {} shutting down ({} processed, {} failed, {} panicked)",
            id,
            stats.get_jobs_processed(),
            stats.get_jobs_failed(),
            stats.get_jobs_panicked()
        );

        state.set(WorkerState::Stopped);
    }

    /// Execute a single job with panic protection, then drop it
    #[allow(unused_variables)]
    fn execute_job(id: usize, mut job: BoxedJob, stats: &WorkerStats) {
        let job_type = job.job_type().to_string();

        #[cfg(feature = "tracing")]
        let job_span = span!(Level::DEBUG, "job_execution", job_type = job_type.as_str());
        #[cfg(feature = "tracing")]
        let _job_guard = job_span.enter();

        let start = Instant::now();

        // Dropping the job runs user code too, so it stays inside the guard.
        let outcome = catch_unwind(AssertUnwindSafe(move || {
            let result = job.execute();
            drop(job);
            result
        }));

        let elapsed = start.elapsed();

        match outcome {
            Ok(Ok(())) => {
                stats.increment_processed();
                #[cfg(feature = "tracing")]
                {
                    debug!(duration_ms = elapsed.as_millis() as u64, "job completed");
                    metrics::job_finished(id, JobOutcome::Completed, elapsed);
                }
            }
            Ok(Err(e)) => {
                let failure = PoolError::execution(job_type.as_str(), e.to_string());
                #[cfg(feature = "tracing")]
                {
                    tracing::warn!(
                        error = %failure,
                        duration_ms = elapsed.as_millis() as u64,
                        "job failed"
                    );
                    metrics::job_finished(id, JobOutcome::Failed, elapsed);
                }
                #[cfg(not(feature = "tracing"))]
                log::warn!("worker {}: {}", id, failure);
                stats.increment_failed();
            }
            Err(panic_info) => {
                let panic_msg = panic_message(&*panic_info);
                #[cfg(feature = "tracing")]
                {
                    tracing::error!(
                        job_type = job_type.as_str(),
                        panic_message = %panic_msg,
                        duration_ms = elapsed.as_millis() as u64,
                        "job panicked"
                    );
                    metrics::job_finished(id, JobOutcome::Panicked, elapsed);
                }
                #[cfg(not(feature = "tracing"))]
                log::error!("worker {}: job '{}' panicked: {}", id, job_type, panic_msg);
                stats.increment_panicked();
            }
        }

        stats.add_processing_time(elapsed.as_micros() as u64);
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if self.thread.is_none() {
            return;
        }

        // Never leave a thread behind: stop, wake and join.
        self.request_stop();
        self.queue.wake_all();
        if let Err(e) = self.join_thread() {
            log::error!("worker {} failed during drop: {}", self.id, e);
        }
    }
}

fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
