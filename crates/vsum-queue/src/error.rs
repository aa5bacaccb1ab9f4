//! Scheduler error types.

use thiserror::Error;

use vsum_models::{JobError, TransitionError};

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job not ready: {0}")]
    NotReady(String),

    #[error("Job {job_id} failed: {error}")]
    JobFailed { job_id: String, error: JobError },

    #[error("Cannot submit an empty chain")]
    EmptyChain,

    #[error("Scheduler is shut down")]
    ShutDown,

    #[error(transparent)]
    IllegalTransition(#[from] TransitionError),
}

impl QueueError {
    pub fn job_not_found(id: impl Into<String>) -> Self {
        Self::JobNotFound(id.into())
    }

    pub fn not_ready(id: impl Into<String>) -> Self {
        Self::NotReady(id.into())
    }
}
