//! Thread creation seam used when the pool starts its workers.

use std::fmt;
use std::io;
use std::thread::{self, JoinHandle};

/// The body a worker thread runs.
pub type WorkerBody = Box<dyn FnOnce() + Send + 'static>;

/// Creates the OS threads that host workers.
///
/// The pool calls [`spawn`](Self::spawn) once per worker during
/// construction. An error from any call aborts construction: the workers
/// already started are stopped and joined and the pool reports
/// [`PoolError::ResourceExhausted`](crate::PoolError::ResourceExhausted).
pub trait ThreadSpawner: Send + Sync {
    /// Starts `body` on a new thread configured by `builder`.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error when the thread cannot be created.
    fn spawn(
        &self,
        worker_id: usize,
        builder: thread::Builder,
        body: WorkerBody,
    ) -> io::Result<JoinHandle<()>>;
}

impl fmt::Debug for dyn ThreadSpawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ThreadSpawner")
    }
}

/// Spawns workers with [`std::thread::Builder::spawn`].
#[derive(Debug, Default, Clone, Copy)]
pub struct OsThreadSpawner;

impl ThreadSpawner for OsThreadSpawner {
    fn spawn(
        &self,
        _worker_id: usize,
        builder: thread::Builder,
        body: WorkerBody,
    ) -> io::Result<JoinHandle<()>> {
        builder.spawn(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_os_spawner_names_thread() {
        let (tx, rx) = mpsc::channel();
        let handle = OsThreadSpawner
            .spawn(
                7,
                thread::Builder::new().name("pool-7".to_string()),
                Box::new(move || {
                    let name = thread::current().name().map(str::to_string);
                    tx.send(name).expect("send failed");
                }),
            )
            .expect("spawn failed");

        handle.join().expect("thread panicked");
        assert_eq!(rx.recv().expect("no name reported").as_deref(), Some("pool-7"));
    }
}
