//! Unbounded FIFO queue guarded by a mutex and a condition variable.

use crate::core::{BoxedJob, PoolError, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

/// An unbounded, mutex-protected FIFO of pending jobs.
///
/// Jobs are owned by the queue while pending and moved out to exactly one
/// consumer by [`pop_blocking`](Self::pop_blocking).
pub struct JobQueue {
    jobs: Mutex<VecDeque<BoxedJob>>,
    available: Condvar,
}

impl JobQueue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    /// Appends a job at the tail and wakes one waiting consumer.
    ///
    /// Never blocks beyond the time needed to take the lock.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ResourceExhausted`] if the queue cannot grow to
    /// hold the job. The job is dropped in that case.
    pub fn push(&self, job: BoxedJob) -> Result<()> {
        {
            let mut jobs = self.jobs.lock();
            jobs.try_reserve(1).map_err(|e| {
                PoolError::resource_exhausted(format!("job queue allocation failed: {}", e))
            })?;
            jobs.push_back(job);
        }

        self.available.notify_one();
        Ok(())
    }

    /// Removes the head job, waiting until one is queued or `stop` is true.
    ///
    /// `stop` is evaluated under the queue lock before every attempt to
    /// dequeue, including after each wakeup. When it returns `true` the call
    /// returns `None` without consuming anything, even if jobs are pending.
    pub fn pop_blocking<P>(&self, mut stop: P) -> Option<BoxedJob>
    where
        P: FnMut() -> bool,
    {
        let mut jobs = self.jobs.lock();

        loop {
            if stop() {
                return None;
            }

            if let Some(job) = jobs.pop_front() {
                return Some(job);
            }

            self.available.wait(&mut jobs);
        }
    }

    /// Wakes every waiting consumer so each re-evaluates its stop predicate.
    ///
    /// The lock is taken and released first: a consumer that has already
    /// checked its predicate but not yet parked holds the lock, so the
    /// broadcast cannot slip in between its check and its wait.
    pub fn wake_all(&self) {
        drop(self.jobs.lock());
        self.available.notify_all();
    }

    /// Removes and returns every pending job.
    pub fn drain(&self) -> Vec<BoxedJob> {
        self.jobs.lock().drain(..).collect()
    }

    /// Returns the number of pending jobs at the time of the call.
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Returns `true` if no job was pending at the time of the call.
    ///
    /// The answer can be stale by the time the caller acts on it.
    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("len", &self.len())
            .finish()
    }
}
