//! The shared job queue.
//!
//! [`JobQueue`] is the only structure every worker and every submitter
//! touches: an unbounded FIFO behind one mutex, paired with one condition
//! variable. Jobs run outside the lock, so contention is bounded by the cost
//! of a push or a pop rather than by job duration.
//!
//! # Wakeup protocol
//!
//! - [`JobQueue::push`] signals a single waiting worker.
//! - [`JobQueue::wake_all`] broadcasts, and is what shutdown uses after
//!   raising the workers' stop flags.
//! - [`JobQueue::pop_blocking`] re-evaluates its predicate after every
//!   wakeup, so spurious wakeups are harmless.
//!
//! [`PendingJobs`] sits beside the queue and counts jobs from acceptance
//! until they finish or are discarded. It has its own lock and condition
//! variable, which only idle waiters block on.
//!
//! ```rust
//! use worker_pool::core::ClosureJob;
//! use worker_pool::queue::JobQueue;
//!
//! # fn main() -> worker_pool::Result<()> {
//! let queue = JobQueue::new();
//! queue.push(Box::new(ClosureJob::new(|| Ok(()))))?;
//!
//! let mut job = queue.pop_blocking(|| false).expect("a job was queued");
//! job.execute()?;
//! assert!(queue.is_empty());
//! # Ok(())
//! # }
//! ```

mod fifo;
mod pending;

pub use fifo::JobQueue;
pub use pending::PendingJobs;
