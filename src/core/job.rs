//! Job trait and related types

use crate::core::error::{PoolError, Result};
use std::fmt;

/// A trait representing a unit of work to be executed by a worker
pub trait Job: Send {
    /// Execute the job
    ///
    /// Called at most once by the worker that dequeued it.
    ///
    /// # Errors
    ///
    /// Returns an error if the job execution fails
    fn execute(&mut self) -> Result<()>;

    /// Get the job's type name for logging and statistics
    fn job_type(&self) -> &str {
        "Job"
    }

    /// Whether the job has nothing left to run.
    ///
    /// The pool refuses to queue spent jobs.
    fn is_spent(&self) -> bool {
        false
    }
}

impl fmt::Debug for dyn Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job({})", self.job_type())
    }
}

/// A boxed job that can be sent across threads
pub type BoxedJob = Box<dyn Job>;

/// Helper to create a job from a closure
pub struct ClosureJob<F>
where
    F: FnOnce() -> Result<()> + Send,
{
    closure: Option<F>,
    name: String,
}

impl<F> ClosureJob<F>
where
    F: FnOnce() -> Result<()> + Send,
{
    /// Create a new closure job
    pub fn new(closure: F) -> Self {
        Self {
            closure: Some(closure),
            name: "ClosureJob".to_string(),
        }
    }

    /// Create a new closure job with a custom name
    pub fn with_name<S: Into<String>>(closure: F, name: S) -> Self {
        Self {
            closure: Some(closure),
            name: name.into(),
        }
    }
}

impl<F> Job for ClosureJob<F>
where
    F: FnOnce() -> Result<()> + Send,
{
    fn execute(&mut self) -> Result<()> {
        match self.closure.take() {
            Some(closure) => closure(),
            None => Err(PoolError::execution(
                self.name.as_str(),
                "job already executed - cannot execute twice",
            )),
        }
    }

    fn job_type(&self) -> &str {
        &self.name
    }

    fn is_spent(&self) -> bool {
        self.closure.is_none()
    }
}

/// A callable paired with the argument it is invoked with.
///
/// The argument is moved into the job and handed to the callable by value
/// when the job runs; it is never cloned.
pub struct TaskJob<A, F>
where
    A: Send,
    F: FnOnce(A) -> Result<()> + Send,
{
    task: Option<(F, A)>,
    name: String,
}

impl<A, F> TaskJob<A, F>
where
    A: Send,
    F: FnOnce(A) -> Result<()> + Send,
{
    /// Create a new task job from a callable and its argument
    pub fn new(func: F, arg: A) -> Self {
        Self {
            task: Some((func, arg)),
            name: "TaskJob".to_string(),
        }
    }

    /// Create a new task job with a custom name
    pub fn with_name<S: Into<String>>(func: F, arg: A, name: S) -> Self {
        Self {
            task: Some((func, arg)),
            name: name.into(),
        }
    }
}

impl<A, F> Job for TaskJob<A, F>
where
    A: Send,
    F: FnOnce(A) -> Result<()> + Send,
{
    fn execute(&mut self) -> Result<()> {
        match self.task.take() {
            Some((func, arg)) => func(arg),
            None => Err(PoolError::execution(
                self.name.as_str(),
                "job already executed - cannot execute twice",
            )),
        }
    }

    fn job_type(&self) -> &str {
        &self.name
    }

    fn is_spent(&self) -> bool {
        self.task.is_none()
    }
}
