//! Thread pool implementation

use crate::core::{BoxedJob, ClosureJob, Job, PoolError, Result, TaskJob};
use crate::pool::spawner::{OsThreadSpawner, ThreadSpawner};
use crate::pool::worker::{Worker, WorkerStatSnapshot, WorkerState, WorkerStats};
use crate::queue::{JobQueue, PendingJobs};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

/// Configuration for a worker pool
#[derive(Clone)]
pub struct PoolConfig {
    /// Number of worker threads, fixed for the life of the pool
    pub num_threads: usize,
    /// Thread name prefix; workers are named `{prefix}-{id}`
    pub thread_name_prefix: String,
    /// Stack size for worker threads (None = platform default)
    pub stack_size: Option<usize>,
    /// Thread creation strategy (None = [`OsThreadSpawner`])
    spawner: Option<Arc<dyn ThreadSpawner>>,
}

impl std::fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolConfig")
            .field("num_threads", &self.num_threads)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field("stack_size", &self.stack_size)
            .field("spawner", &self.spawner.as_ref().map(|_| "<custom spawner>"))
            .finish()
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get(),
            thread_name_prefix: "worker".to_string(),
            stack_size: None,
            spawner: None,
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with the given number of workers
    ///
    /// A count of zero is kept as-is and rejected by [`validate`](Self::validate).
    #[must_use]
    pub fn new(num_threads: usize) -> Self {
        Self {
            num_threads,
            ..Default::default()
        }
    }

    /// Set thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the stack size of each worker thread in bytes
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Use a custom thread spawner.
    ///
    /// # Example
    ///
    /// ```rust
    /// use worker_pool::prelude::*;
    /// use std::sync::Arc;
    ///
    /// # fn main() -> Result<()> {
    /// let config = PoolConfig::new(2).with_spawner(Arc::new(OsThreadSpawner));
    /// let pool = ThreadPool::with_config(config)?;
    /// # pool.shutdown()?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_spawner(mut self, spawner: Arc<dyn ThreadSpawner>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(PoolError::invalid_argument(
                "num_threads",
                "Number of threads must be greater than 0",
            ));
        }
        if self.stack_size == Some(0) {
            return Err(PoolError::invalid_argument(
                "stack_size",
                "Stack size must be greater than 0",
            ));
        }
        Ok(())
    }

    fn thread_builder(&self, id: usize) -> thread::Builder {
        let builder = thread::Builder::new().name(format!("{}-{}", self.thread_name_prefix, id));
        match self.stack_size {
            Some(bytes) => builder.stack_size(bytes),
            None => builder,
        }
    }
}

/// Aggregate statistics for a pool, suitable for export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolStats {
    /// Whether the pool still accepts jobs
    pub running: bool,
    /// Jobs accepted by `submit`
    pub jobs_submitted: u64,
    /// Jobs waiting in the queue
    pub jobs_queued: usize,
    /// Per-worker snapshots, ordered by worker ID
    pub workers: Vec<WorkerStatSnapshot>,
}

/// A fixed-size pool of worker threads fed from one FIFO queue
///
/// # Shutdown Mechanism
///
/// [`shutdown`](Self::shutdown) clears every worker's stop flag, wakes all
/// of them at once, and joins each thread. A job that is already running
/// finishes; jobs still queued are dropped without running. Dropping the
/// pool performs the same shutdown.
///
/// # Example
///
/// ```rust
/// use worker_pool::prelude::*;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// # fn main() -> Result<()> {
/// let pool = ThreadPool::new(3)?;
/// let counter = Arc::new(AtomicUsize::new(0));
///
/// for _ in 0..10 {
///     let counter = Arc::clone(&counter);
///     pool.execute(move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     })?;
/// }
///
/// pool.wait_idle();
/// pool.shutdown()?;
/// assert_eq!(counter.load(Ordering::SeqCst), 10);
/// # Ok(())
/// # }
/// ```
pub struct ThreadPool {
    config: PoolConfig,
    queue: Arc<JobQueue>,
    pending: Arc<PendingJobs>,
    workers: Mutex<Vec<Worker>>,
    running: AtomicBool,
    shutdown_lock: Mutex<()>,
    total_jobs_submitted: AtomicU64,
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("config", &self.config)
            .field("running", &self.running.load(Ordering::Relaxed))
            .field(
                "total_jobs_submitted",
                &self.total_jobs_submitted.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl ThreadPool {
    /// Create a pool with `num_threads` workers, all started immediately
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidArgument` - `num_threads` is zero
    /// - `PoolError::ResourceExhausted` - a worker thread could not be created
    pub fn new(num_threads: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(num_threads))
    }

    /// Create a pool from a configuration, starting every worker
    ///
    /// The queue exists before the first worker is spawned. If spawning
    /// worker *k* fails, workers `0..k` are stopped and joined before the
    /// error is returned, so a failed construction leaves no threads behind.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let queue = Arc::new(JobQueue::new());
        let pending = Arc::new(PendingJobs::new());
        let default_spawner = OsThreadSpawner;
        let spawner: &dyn ThreadSpawner = match &config.spawner {
            Some(custom) => custom.as_ref(),
            None => &default_spawner,
        };

        let mut workers = Vec::with_capacity(config.num_threads);
        for id in 0..config.num_threads {
            let spawned = Worker::spawn(
                id,
                Arc::clone(&queue),
                Arc::clone(&pending),
                config.thread_builder(id),
                spawner,
            );
            match spawned {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    log::error!(
                        "failed to start worker {} of {}: {}; unwinding {} started workers",
                        id,
                        config.num_threads,
                        e,
                        workers.len()
                    );
                    if let Err(join_err) = stop_and_join(&queue, workers) {
                        log::error!("while unwinding partial pool: {}", join_err);
                    }
                    return Err(e);
                }
            }
        }

        #[cfg(feature = "tracing")]
        crate::tracing::metrics::pool_started(&config.thread_name_prefix, config.num_threads);
        #[cfg(not(feature = "tracing"))]
        log::info!(
            "worker pool '{}' started with {} workers",
            config.thread_name_prefix,
            config.num_threads
        );

        Ok(Self {
            config,
            queue,
            pending,
            workers: Mutex::new(workers),
            running: AtomicBool::new(true),
            shutdown_lock: Mutex::new(()),
            total_jobs_submitted: AtomicU64::new(0),
        })
    }

    /// Submit a job to the pool
    ///
    /// Queues the job, wakes one waiting worker and returns without waiting
    /// for the job to run. There is no handle to the job's outcome.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidArgument` - the job is spent
    /// - `PoolError::ShuttingDown` - shutdown has begun; the job is dropped
    /// - `PoolError::ResourceExhausted` - the queue could not grow
    pub fn submit<J: Job + 'static>(&self, job: J) -> Result<()> {
        self.submit_boxed(Box::new(job))
    }

    /// Submit an already boxed job
    pub fn submit_boxed(&self, job: BoxedJob) -> Result<()> {
        if job.is_spent() {
            return Err(PoolError::invalid_argument(
                "job",
                format!("job '{}' has nothing left to execute", job.job_type()),
            ));
        }

        if !self.running.load(Ordering::Acquire) {
            return Err(PoolError::shutting_down(self.queue.len()));
        }

        self.pending.add();
        if let Err(e) = self.queue.push(job) {
            self.pending.discard(1);
            return Err(e);
        }
        self.total_jobs_submitted.fetch_add(1, Ordering::Release);

        #[cfg(feature = "tracing")]
        crate::tracing::metrics::job_submitted(self.queue.len());

        Ok(())
    }

    /// Submit a closure as a job
    pub fn execute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.submit(ClosureJob::new(f))
    }

    /// Submit a callable together with the argument it will be called with
    ///
    /// The argument is moved into the job and handed to `f` on the worker.
    pub fn execute_with<A, F>(&self, f: F, arg: A) -> Result<()>
    where
        A: Send + 'static,
        F: FnOnce(A) -> Result<()> + Send + 'static,
    {
        self.submit(TaskJob::new(f, arg))
    }

    /// Submit a job that runs inside the caller's current tracing span
    pub fn submit_traced<J: Job + 'static>(&self, job: J) -> Result<()> {
        self.submit(crate::tracing::TracedJob::new(job))
    }

    /// Get the number of worker threads
    pub fn num_threads(&self) -> usize {
        self.config.num_threads
    }

    /// Check if the pool still accepts jobs
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Get total number of jobs accepted by `submit`
    pub fn total_jobs_submitted(&self) -> u64 {
        self.total_jobs_submitted.load(Ordering::Acquire)
    }

    /// Get current queue size
    ///
    /// The value may change between checking and using it.
    pub fn queue_size(&self) -> usize {
        self.queue.len()
    }

    /// Get statistics for all workers
    pub fn get_stats(&self) -> Vec<Arc<WorkerStats>> {
        self.workers.lock().iter().map(|w| w.stats()).collect()
    }

    /// Get the lifecycle state of every worker, ordered by worker ID
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.workers.lock().iter().map(|w| w.state()).collect()
    }

    /// Take a serialisable snapshot of the pool and its workers
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            running: self.is_running(),
            jobs_submitted: self.total_jobs_submitted(),
            jobs_queued: self.queue.len(),
            workers: self.workers.lock().iter().map(|w| w.snapshot()).collect(),
        }
    }

    /// Get total jobs completed successfully across all workers
    pub fn total_jobs_processed(&self) -> u64 {
        self.sum_stats(WorkerStats::get_jobs_processed)
    }

    /// Get total jobs that returned an error across all workers
    pub fn total_jobs_failed(&self) -> u64 {
        self.sum_stats(WorkerStats::get_jobs_failed)
    }

    /// Get total jobs that panicked across all workers
    pub fn total_jobs_panicked(&self) -> u64 {
        self.sum_stats(WorkerStats::get_jobs_panicked)
    }

    fn sum_stats(&self, counter: fn(&WorkerStats) -> u64) -> u64 {
        self.workers.lock().iter().map(|w| counter(w.stats().as_ref())).sum()
    }

    /// Block until every submitted job has been executed.
    ///
    /// Everything the finished jobs wrote is visible to the caller once this
    /// returns. Jobs submitted concurrently extend the wait. Returns early if
    /// the pool shuts down, at the latest once shutdown has joined the
    /// workers and dropped the queued jobs.
    pub fn wait_idle(&self) {
        self.pending.wait_idle(|| !self.is_running());
    }

    /// Shutdown the pool and wait for all workers to finish
    ///
    /// 1. Stops accepting new jobs (sets running = false)
    /// 2. Clears every worker's stop flag
    /// 3. Wakes all workers at once
    /// 4. Joins every worker thread
    /// 5. Drops jobs that were still queued
    ///
    /// Jobs already running complete; queued jobs are abandoned.
    ///
    /// # Thread Safety
    ///
    /// Concurrent and repeated calls are serialised. Only the first performs
    /// the shutdown. The others block until it has joined every worker and
    /// then return `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::JoinError` if a worker thread itself panicked.
    /// Every other worker is still joined first.
    pub fn shutdown(&self) -> Result<()> {
        let _serial = self.shutdown_lock.lock();
        if !self.running.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let workers = std::mem::take(&mut *self.workers.lock());
        let processed: u64 = workers.iter().map(|w| w.stats().get_jobs_processed()).sum();
        let failed: u64 = workers
            .iter()
            .map(|w| w.stats().get_jobs_failed() + w.stats().get_jobs_panicked())
            .sum();

        let joined = stop_and_join(&self.queue, workers);

        let abandoned = self.queue.drain();
        self.pending.discard(abandoned.len());
        if !abandoned.is_empty() {
            log::warn!(
                "worker pool '{}' abandoned {} queued jobs at shutdown",
                self.config.thread_name_prefix,
                abandoned.len()
            );
        }

        #[cfg(feature = "tracing")]
        crate::tracing::metrics::pool_stopped(
            &self.config.thread_name_prefix,
            processed,
            failed,
            abandoned.len(),
        );
        #[cfg(not(feature = "tracing"))]
        log::info!(
            "worker pool '{}' shut down ({} processed, {} failed, {} abandoned)",
            self.config.thread_name_prefix,
            processed,
            failed,
            abandoned.len()
        );

        joined
    }
}

/// Stops every worker, broadcasts once, then joins them all.
///
/// Returns the first join error after all workers have been joined.
fn stop_and_join(queue: &JobQueue, workers: Vec<Worker>) -> Result<()> {
    for worker in &workers {
        worker.request_stop();
    }
    queue.wake_all();

    let mut first_error = None;
    for worker in workers {
        let id = worker.id();
        if let Err(e) = worker.join() {
            log::error!("worker {} did not shut down cleanly: {}", id, e);
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!(
                "failed to shut down worker pool '{}' during drop: {}",
                self.config.thread_name_prefix,
                e
            );
        }
    }
}
