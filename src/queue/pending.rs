//! Count of jobs accepted but not yet finished.

use parking_lot::{Condvar, Mutex};

/// Tracks jobs from acceptance until they have run or been discarded.
///
/// The count covers both queued and running jobs. Every change happens
/// under one mutex, so a thread released by [`wait_idle`](Self::wait_idle)
/// observes everything the finished jobs did before they were counted off.
#[derive(Debug, Default)]
pub struct PendingJobs {
    count: Mutex<usize>,
    idle: Condvar,
}

impl PendingJobs {
    /// Creates a tracker with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one more accepted job.
    pub fn add(&self) {
        *self.count.lock() += 1;
    }

    /// Counts off one job that has finished running.
    pub fn complete(&self) {
        self.release(1);
    }

    /// Counts off jobs that were dropped without running.
    ///
    /// Waiters are woken even when `jobs` is zero so they re-check their
    /// give-up predicate.
    pub fn discard(&self, jobs: usize) {
        self.release(jobs);
        self.idle.notify_all();
    }

    fn release(&self, jobs: usize) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(jobs);
        if *count == 0 {
            drop(count);
            self.idle.notify_all();
        }
    }

    /// Returns the number of pending jobs at the time of the call.
    pub fn get(&self) -> usize {
        *self.count.lock()
    }

    /// Blocks until nothing is pending or `give_up` returns `true`.
    ///
    /// `give_up` is evaluated under the lock before every wait, so a caller
    /// that flips its condition and then calls [`discard`](Self::discard)
    /// cannot be missed.
    pub fn wait_idle<P>(&self, mut give_up: P)
    where
        P: FnMut() -> bool,
    {
        let mut count = self.count.lock();
        while *count > 0 && !give_up() {
            self.idle.wait(&mut count);
        }
    }
}
