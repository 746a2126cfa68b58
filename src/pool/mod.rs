//! Thread pool and worker implementations

pub mod spawner;
pub mod thread_pool;
pub mod worker;

pub use spawner::{OsThreadSpawner, ThreadSpawner, WorkerBody};
pub use thread_pool::{PoolConfig, PoolStats, ThreadPool};
pub use worker::{Worker, WorkerStatSnapshot, WorkerState, WorkerStats};
