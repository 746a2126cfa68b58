//! End-to-end tests for pool construction, submission, wakeups and shutdown

use parking_lot::Mutex;
use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use worker_pool::pool::WorkerBody;
use worker_pool::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_fifo_within_single_producer() {
    init_logging();
    let pool = ThreadPool::new(1).expect("Failed to create pool");
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..100 {
        let order = Arc::clone(&order);
        pool.execute(move || {
            order.lock().push(i);
            Ok(())
        })
        .expect("Failed to submit job");
    }

    pool.wait_idle();
    pool.shutdown().expect("Failed to shutdown pool");

    let order = order.lock();
    assert_eq!(*order, (0..100).collect::<Vec<_>>());
}

#[test]
fn test_exactly_once_under_concurrent_submission() {
    init_logging();
    let pool = Arc::new(ThreadPool::new(4).expect("Failed to create pool"));
    let hits: Arc<Vec<AtomicUsize>> = Arc::new((0..1000).map(|_| AtomicUsize::new(0)).collect());

    let producers: Vec<_> = (0..10)
        .map(|p| {
            let pool = Arc::clone(&pool);
            let hits = Arc::clone(&hits);
            thread::spawn(move || {
                for j in 0..100 {
                    let hits = Arc::clone(&hits);
                    let index = p * 100 + j;
                    pool.execute(move || {
                        hits[index].fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .expect("Failed to submit job");
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().expect("Producer panicked");
    }

    pool.wait_idle();
    pool.shutdown().expect("Failed to shutdown pool");

    assert_eq!(pool.total_jobs_submitted(), 1000);
    assert!(hits.iter().all(|h| h.load(Ordering::SeqCst) == 1));
}

#[test]
fn test_submit_while_idle_is_picked_up() {
    init_logging();
    let pool = ThreadPool::new(3).expect("Failed to create pool");

    // Let every worker reach its wait before each round of submissions.
    for round in 0..20 {
        let deadline = Instant::now() + Duration::from_secs(2);
        while pool.worker_states().iter().any(|s| *s != WorkerState::Waiting)
            && Instant::now() < deadline
        {
            thread::sleep(Duration::from_millis(1));
        }

        let (tx, rx) = mpsc::channel();
        pool.execute(move || {
            tx.send(round).map_err(|e| PoolError::other(e.to_string()))
        })
        .expect("Failed to submit job");

        let got = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("job submitted to an idle pool was never run");
        assert_eq!(got, round);
    }
}

#[test]
fn test_shutdown_of_idle_pool_is_prompt() {
    init_logging();
    let pool = ThreadPool::new(8).expect("Failed to create pool");
    thread::sleep(Duration::from_millis(20));

    let start = Instant::now();
    pool.shutdown().expect("Failed to shutdown pool");

    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(!pool.is_running());
}

/// Spawns OS threads and counts those whose worker body has returned.
struct CountingSpawner {
    exited: Arc<AtomicUsize>,
}

impl ThreadSpawner for CountingSpawner {
    fn spawn(
        &self,
        _worker_id: usize,
        builder: thread::Builder,
        body: WorkerBody,
    ) -> io::Result<thread::JoinHandle<()>> {
        let exited = Arc::clone(&self.exited);
        builder.spawn(move || {
            body();
            exited.fetch_add(1, Ordering::SeqCst);
        })
    }
}

#[test]
fn test_workers_stopped_after_shutdown() {
    init_logging();
    let exited = Arc::new(AtomicUsize::new(0));
    let config = PoolConfig::new(3).with_spawner(Arc::new(CountingSpawner {
        exited: Arc::clone(&exited),
    }));
    let pool = ThreadPool::with_config(config).expect("Failed to create pool");

    for _ in 0..6 {
        pool.execute(|| {
            thread::sleep(Duration::from_millis(5));
            Ok(())
        })
        .expect("Failed to submit job");
    }
    assert_eq!(pool.worker_states().len(), 3);
    assert_eq!(exited.load(Ordering::SeqCst), 0);

    pool.shutdown().expect("Failed to shutdown pool");

    // A worker body returns only after its state reached Stopped.
    assert_eq!(exited.load(Ordering::SeqCst), 3);
    assert!(pool.worker_states().is_empty());
    assert!(pool.stats().workers.is_empty());
}

#[test]
fn test_drop_joins_workers() {
    init_logging();
    let finished = Arc::new(AtomicUsize::new(0));
    {
        let pool = ThreadPool::new(2).expect("Failed to create pool");
        for _ in 0..2 {
            let finished = Arc::clone(&finished);
            pool.execute(move || {
                thread::sleep(Duration::from_millis(50));
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .expect("Failed to submit job");
        }
        pool.wait_idle();
    }
    assert_eq!(finished.load(Ordering::SeqCst), 2);
}

#[test]
fn test_running_job_completes_during_shutdown() {
    init_logging();
    let pool = ThreadPool::new(1).expect("Failed to create pool");
    let (started_tx, started_rx) = mpsc::channel();
    let completed = Arc::new(AtomicUsize::new(0));

    {
        let completed = Arc::clone(&completed);
        pool.execute(move || {
            started_tx.send(()).map_err(|e| PoolError::other(e.to_string()))?;
            thread::sleep(Duration::from_millis(100));
            completed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .expect("Failed to submit job");
    }

    started_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("job never started");
    pool.shutdown().expect("Failed to shutdown pool");

    assert_eq!(completed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failing_and_panicking_jobs_are_absorbed() {
    init_logging();
    let pool = ThreadPool::new(2).expect("Failed to create pool");

    for i in 0..30 {
        pool.execute(move || match i % 3 {
            0 => Err(PoolError::other("expected failure")),
            1 => panic!("expected panic"),
            _ => Ok(()),
        })
        .expect("Failed to submit job");
    }

    pool.wait_idle();

    assert_eq!(pool.total_jobs_failed(), 10);
    assert_eq!(pool.total_jobs_panicked(), 10);
    assert_eq!(pool.total_jobs_processed(), 10);
    assert!(pool
        .worker_states()
        .iter()
        .all(|s| *s != WorkerState::Stopped));

    pool.shutdown().expect("Failed to shutdown pool");
}

#[test]
fn test_fifty_indexed_jobs_on_three_workers() {
    init_logging();
    let pool = ThreadPool::new(3).expect("Failed to create pool");
    let seen = Arc::new(Mutex::new(Vec::new()));

    for i in 0..50usize {
        pool.execute_with(
            |(i, seen): (usize, Arc<Mutex<Vec<usize>>>)| {
                seen.lock().push(i);
                thread::sleep(Duration::from_millis(10));
                Ok(())
            },
            (i, Arc::clone(&seen)),
        )
        .expect("Failed to submit job");
    }

    let start = Instant::now();
    pool.wait_idle();
    assert!(start.elapsed() < Duration::from_secs(5));
    pool.shutdown().expect("Failed to shutdown pool");

    let seen = seen.lock();
    assert_eq!(seen.len(), 50);
    let unique: HashSet<_> = seen.iter().copied().collect();
    assert_eq!(unique, (0..50).collect::<HashSet<_>>());
}

#[test]
fn test_stats_serialize() {
    init_logging();
    let pool = ThreadPool::new(2).expect("Failed to create pool");
    pool.execute(|| Ok(())).expect("Failed to submit job");
    pool.wait_idle();

    let json = serde_json::to_value(pool.stats()).expect("stats should serialize");

    assert_eq!(json["jobs_submitted"], 1);
    assert_eq!(json["running"], true);
    assert_eq!(json["workers"].as_array().map(Vec::len), Some(2));
    assert!(json["workers"][0]["state"].is_string());
}

#[test]
fn test_traced_submission_runs() {
    init_logging();
    let pool = ThreadPool::new(1).expect("Failed to create pool");
    let (tx, rx) = mpsc::channel();

    pool.submit_traced(ClosureJob::with_name(
        move || tx.send(()).map_err(|e| PoolError::other(e.to_string())),
        "traced",
    ))
    .expect("Failed to submit job");

    rx.recv_timeout(Duration::from_secs(2))
        .expect("traced job never ran");
}
