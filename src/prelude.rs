//! Convenient re-exports for common types and traits

pub use crate::core::{BoxedJob, ClosureJob, Job, PoolError, Result, TaskJob};
pub use crate::pool::{
    OsThreadSpawner, PoolConfig, PoolStats, ThreadPool, ThreadSpawner, WorkerState, WorkerStats,
};
pub use crate::tracing::TracedJob;
