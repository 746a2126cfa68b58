//! Error types for the worker pool

/// Result type for worker pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur in the worker pool
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PoolError {
    /// An argument was rejected before any work was done
    #[error("Invalid argument '{parameter}': {message}")]
    InvalidArgument {
        /// Name of the rejected parameter
        parameter: String,
        /// Error message
        message: String,
    },

    /// The runtime could not provide a thread or queue memory
    #[error("{}", resource_message(.worker_id, .message))]
    ResourceExhausted {
        /// Worker whose thread could not be created, if any
        worker_id: Option<usize>,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// A job failed while running on a worker
    #[error("Job '{job_type}' failed: {message}")]
    JobExecutionFailure {
        /// Type name of the failed job
        job_type: String,
        /// Error message
        message: String,
    },

    /// The pool no longer accepts jobs
    #[error("Worker pool is shutting down ({pending_jobs} jobs pending)")]
    ShuttingDown {
        /// Number of jobs still queued when the submission was refused
        pending_jobs: usize,
    },

    /// A worker thread terminated abnormally and could not be joined cleanly
    #[error("Failed to join worker thread #{worker_id}: {message}")]
    JoinError {
        /// ID of the worker
        worker_id: usize,
        /// Error message
        message: String,
    },

    /// General error
    #[error("{0}")]
    Other(String),
}

fn resource_message(worker_id: &Option<usize>, message: &str) -> String {
    match worker_id {
        Some(id) => format!("Resources exhausted spawning worker thread #{}: {}", id, message),
        None => format!("Resources exhausted: {}", message),
    }
}

impl PoolError {
    /// Create an invalid argument error
    pub fn invalid_argument(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        PoolError::InvalidArgument {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a resource exhausted error for a worker thread that failed to spawn
    pub fn spawn_failed(worker_id: usize, source: std::io::Error) -> Self {
        PoolError::ResourceExhausted {
            worker_id: Some(worker_id),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a resource exhausted error not tied to a worker
    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        PoolError::ResourceExhausted {
            worker_id: None,
            message: message.into(),
            source: None,
        }
    }

    /// Create a job execution failure
    pub fn execution(job_type: impl Into<String>, message: impl Into<String>) -> Self {
        PoolError::JobExecutionFailure {
            job_type: job_type.into(),
            message: message.into(),
        }
    }

    /// Create a shutting down error
    pub fn shutting_down(pending_jobs: usize) -> Self {
        PoolError::ShuttingDown { pending_jobs }
    }

    /// Create a join error
    pub fn join(worker_id: usize, message: impl Into<String>) -> Self {
        PoolError::JoinError {
            worker_id,
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        PoolError::Other(msg.into())
    }
}
