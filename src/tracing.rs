//! Tracing integration for observability.
//!
//! Without the `tracing` feature the pool reports through the `log` facade
//! and [`TracedJob`] is a transparent wrapper. With the feature enabled,
//! workers run inside `worker` spans, each job inside a `job_execution`
//! span, and the [`metrics`] events below are emitted.
//!
//! # Example
//!
//! ```rust,ignore
//! use worker_pool::prelude::*;
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env()
//!         .add_directive("worker_pool=debug".parse().unwrap()))
//!     .init();
//!
//! let pool = ThreadPool::new(4)?;
//!
//! let span = tracing::info_span!("request", id = 7);
//! let _entered = span.enter();
//! // The job runs inside `request` even though a worker executes it.
//! pool.submit_traced(ClosureJob::new(|| Ok(())))?;
//! ```

use crate::core::{Job, Result};

/// A job wrapper that carries the submitter's tracing span to the worker.
///
/// The current span is captured when the wrapper is created and entered
/// around [`Job::execute`].
pub struct TracedJob<J: Job> {
    inner: J,
    #[cfg(feature = "tracing")]
    span: tracing::Span,
}

impl<J: Job> TracedJob<J> {
    /// Wraps `job`, capturing the current span.
    pub fn new(job: J) -> Self {
        Self {
            inner: job,
            #[cfg(feature = "tracing")]
            span: tracing::Span::current(),
        }
    }

    /// Wraps `job` with an explicit span.
    #[cfg(feature = "tracing")]
    pub fn with_span(job: J, span: tracing::Span) -> Self {
        Self { inner: job, span }
    }
}

impl<J: Job> Job for TracedJob<J> {
    fn execute(&mut self) -> Result<()> {
        #[cfg(feature = "tracing")]
        let _guard = self.span.enter();
        self.inner.execute()
    }

    fn job_type(&self) -> &str {
        self.inner.job_type()
    }

    fn is_spent(&self) -> bool {
        self.inner.is_spent()
    }
}

/// Structured events describing pool activity.
///
/// Every event targets `worker_pool::metrics`, so a subscriber can route
/// them separately from diagnostics. Job and worker events are `TRACE`;
/// pool lifecycle events are `INFO`.
#[cfg(feature = "tracing")]
pub mod metrics {
    use crate::pool::WorkerState;
    use std::time::Duration;

    const TARGET: &str = "worker_pool::metrics";

    /// How a job left the worker.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum JobOutcome {
        /// `execute` returned `Ok`
        Completed,
        /// `execute` returned `Err`
        Failed,
        /// `execute` or the job's drop panicked
        Panicked,
    }

    impl JobOutcome {
        /// Lowercase label used as the `outcome` field.
        pub fn as_str(self) -> &'static str {
            match self {
                JobOutcome::Completed => "completed",
                JobOutcome::Failed => "failed",
                JobOutcome::Panicked => "panicked",
            }
        }
    }

    /// A job was accepted; `queue_depth` includes it.
    pub fn job_submitted(queue_depth: usize) {
        tracing::trace!(target: TARGET, queue_depth, "job queued");
    }

    /// A worker finished with a job.
    pub fn job_finished(worker_id: usize, outcome: JobOutcome, elapsed: Duration) {
        tracing::trace!(
            target: TARGET,
            worker_id,
            outcome = outcome.as_str(),
            elapsed_us = elapsed.as_micros() as u64,
            "job finished"
        );
    }

    /// A worker moved between waiting and running.
    pub fn worker_transition(worker_id: usize, state: WorkerState) {
        tracing::trace!(target: TARGET, worker_id, state = ?state, "worker state");
    }

    /// Every worker of the pool has been started.
    pub fn pool_started(pool: &str, workers: usize) {
        tracing::info!(target: TARGET, pool, workers, "pool started");
    }

    /// Shutdown has joined every worker and dropped the queued jobs.
    pub fn pool_stopped(pool: &str, processed: u64, failed: u64, abandoned: usize) {
        tracing::info!(
            target: TARGET,
            pool,
            processed,
            failed,
            abandoned,
            "pool stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ClosureJob;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    #[cfg(feature = "tracing")]
    use tracing::field::{Field, Visit};
    #[cfg(feature = "tracing")]
    use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

    #[test]
    fn test_traced_job_executes() {
        let executed = Arc::new(AtomicBool::new(false));
        let executed_clone = executed.clone();

        let job = ClosureJob::new(move || {
            executed_clone.store(true, Ordering::SeqCst);
            Ok(())
        });

        let mut traced = TracedJob::new(job);
        traced.execute().expect("Job should execute");

        assert!(executed.load(Ordering::SeqCst));
        assert!(traced.is_spent());
    }

    #[test]
    fn test_traced_job_preserves_job_type() {
        let job = ClosureJob::with_name(|| Ok(()), "Indexed");
        let traced = TracedJob::new(job);

        assert_eq!(traced.job_type(), "Indexed");
    }

    /// Records span entries with the entering thread, and event messages.
    #[cfg(feature = "tracing")]
    #[derive(Clone, Default)]
    struct Recorder {
        entered: Arc<parking_lot::Mutex<Vec<(&'static str, Option<String>)>>>,
        messages: Arc<parking_lot::Mutex<Vec<String>>>,
    }

    #[cfg(feature = "tracing")]
    struct MessageVisitor(Option<String>);

    #[cfg(feature = "tracing")]
    impl Visit for MessageVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = Some(format!("{:?}", value));
            }
        }
    }

    #[cfg(feature = "tracing")]
    impl<S> Layer<S> for Recorder
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_enter(&self, id: &tracing::span::Id, ctx: Context<'_, S>) {
            if let Some(span) = ctx.span(id) {
                let thread = std::thread::current().name().map(str::to_string);
                self.entered.lock().push((span.name(), thread));
            }
        }

        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = MessageVisitor(None);
            event.record(&mut visitor);
            if let Some(message) = visitor.0 {
                self.messages.lock().push(message);
            }
        }
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn test_submitter_span_entered_on_worker_thread() {
        use crate::pool::{PoolConfig, ThreadPool};
        use crate::PoolError;
        use std::sync::mpsc;
        use std::time::Duration;
        use tracing_subscriber::layer::SubscriberExt;

        let recorder = Recorder::default();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());

        tracing::subscriber::with_default(subscriber, || {
            let config = PoolConfig::new(1).with_thread_name_prefix("traced");
            let pool = ThreadPool::with_config(config).expect("Failed to create pool");
            let (tx, rx) = mpsc::channel();

            let request = tracing::info_span!("request", id = 7);
            {
                let _entered = request.enter();
                pool.submit_traced(ClosureJob::new(move || {
                    tx.send(()).map_err(|e| PoolError::other(e.to_string()))
                }))
                .expect("Failed to submit job");
            }

            rx.recv_timeout(Duration::from_secs(2))
                .expect("traced job never ran");
            pool.shutdown().expect("Failed to shutdown pool");
        });

        let entered = recorder.entered.lock();
        assert!(entered
            .iter()
            .any(|(span, thread)| *span == "request" && thread.as_deref() == Some("traced-0")));

        let messages = recorder.messages.lock();
        for expected in ["pool started", "job queued", "pool stopped"] {
            assert!(
                messages.iter().any(|m| m == expected),
                "missing event '{}' in {:?}",
                expected,
                *messages
            );
        }
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn test_job_outcome_labels() {
        use metrics::JobOutcome;

        let labels: Vec<_> = [JobOutcome::Completed, JobOutcome::Failed, JobOutcome::Panicked]
            .iter()
            .map(|o| o.as_str())
            .collect();
        assert_eq!(labels, vec!["completed", "failed", "panicked"]);
    }
}
