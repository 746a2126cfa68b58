//! Basic worker pool usage example
//!
//! Starts three workers, queues fifty jobs that each print their index and
//! sleep, waits for them to finish and shuts the pool down.
//!
//! Run with: RUST_LOG=debug cargo run --example basic_pool

use std::thread;
use std::time::Duration;
use worker_pool::prelude::*;

fn print_index(index: usize) -> Result<()> {
    println!("NUM {} on {:?}", index, thread::current().name());
    thread::sleep(Duration::from_millis(100));
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let pool = ThreadPool::new(3)?;
    println!("Started pool with {} workers", pool.num_threads());

    for index in 0..50 {
        pool.execute_with(print_index, index)?;
    }
    println!("Submitted {} jobs", pool.total_jobs_submitted());

    pool.wait_idle();

    for snapshot in pool.stats().workers {
        println!(
            "Worker {}: {} processed, avg time: {:.2}μs",
            snapshot.worker_id, snapshot.jobs_processed, snapshot.average_processing_time_us
        );
    }

    pool.shutdown()?;
    println!("All workers joined");

    Ok(())
}
