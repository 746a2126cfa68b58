//! # Worker Pool
//!
//! A fixed-size worker thread pool: a set of long-lived threads that pull
//! jobs from one shared FIFO queue, synchronized by a mutex and a condition
//! variable.
//!
//! ## Features
//!
//! - **Fixed Workers**: the worker count is set at construction and never changes
//! - **FIFO Queue**: unbounded, one mutex, single wakeup per submitted job
//! - **Isolated Failures**: errors and panics inside a job are logged and counted, never fatal to a worker
//! - **Joined Shutdown**: every worker thread is stopped and joined, including after a failed construction
//! - **Worker Statistics**: per-worker counters and lifecycle state, exportable with serde
//!
//! ## Quick Start
//!
//! ```rust
//! use worker_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! // Create a pool; its workers start immediately
//! let pool = ThreadPool::new(4)?;
//!
//! // Submit jobs
//! for i in 0..10 {
//!     pool.execute(move || {
//!         println!("Job {} executing", i);
//!         Ok(())
//!     })?;
//! }
//!
//! // Wait for the queue to empty, then stop and join every worker
//! pool.wait_idle();
//! pool.shutdown()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Jobs With Arguments
//!
//! ```rust
//! use worker_pool::prelude::*;
//!
//! fn report(n: u32) -> Result<()> {
//!     println!("NUM {}", n);
//!     Ok(())
//! }
//!
//! # fn main() -> Result<()> {
//! let pool = ThreadPool::new(2)?;
//! for n in 0..5 {
//!     pool.execute_with(report, n)?;
//! }
//! # pool.wait_idle();
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Jobs
//!
//! ```rust
//! use worker_pool::prelude::*;
//!
//! struct MyJob {
//!     data: String,
//! }
//!
//! impl Job for MyJob {
//!     fn execute(&mut self) -> Result<()> {
//!         println!("Processing: {}", self.data);
//!         Ok(())
//!     }
//!
//!     fn job_type(&self) -> &str {
//!         "MyJob"
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! # let pool = ThreadPool::new(2)?;
//! pool.submit(MyJob {
//!     data: "test".to_string(),
//! })?;
//! # pool.wait_idle();
//! # Ok(())
//! # }
//! ```
//!
//! ## Shutdown Semantics
//!
//! Shutdown stops workers from taking new jobs: a job already running
//! completes, jobs still queued are dropped unexecuted. Call
//! [`ThreadPool::wait_idle`] first when every submitted job must run.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod pool;
pub mod prelude;
pub mod queue;
pub mod tracing;

pub use core::{BoxedJob, ClosureJob, Job, PoolError, Result, TaskJob};
pub use pool::{PoolConfig, PoolStats, ThreadPool, WorkerState, WorkerStats};
