//! Units of work executed by the scheduler.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use vsum_models::{ErrorKind, JobError, JobId, JobKind};

use crate::error::QueueResult;
use crate::handle::ChainHandle;
use crate::retry::RetryPolicy;
use crate::scheduler::Scheduler;

pub type StageResult = Result<Value, StageError>;

/// Classified stage failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Store, message)
    }

    /// Only transient failures consume retry budget; everything else is terminal.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for StageError {}

impl From<StageError> for JobError {
    fn from(e: StageError) -> Self {
        JobError::new(e.kind, e.message)
    }
}

/// A single schedulable unit.
///
/// A stage carries its own arguments; in a chain it additionally receives
/// the previous stage's output through `StageContext::input`.
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> JobKind;

    /// Retry budget and backoff for this stage.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::for_kind(self.kind())
    }

    async fn run(&self, ctx: &StageContext) -> StageResult;
}

/// Per-attempt execution context.
pub struct StageContext {
    pub job_id: JobId,
    /// 1-based attempt number
    pub attempt: u32,
    /// Output of the preceding stage when running inside a chain
    pub input: Option<Value>,
    pub(crate) scheduler: Scheduler,
}

impl StageContext {
    /// Previous stage output as a string, if it is one.
    pub fn input_str(&self) -> Option<&str> {
        self.input.as_ref().and_then(Value::as_str)
    }

    /// Dispatch a chain on behalf of this job.
    ///
    /// The current job is linked to the chain, so querying it resolves to
    /// the chain's status once this job has succeeded.
    pub async fn dispatch_chain(&self, stages: Vec<Arc<dyn Stage>>) -> QueueResult<ChainHandle> {
        let chain = self.scheduler.submit_chain(stages).await?;
        self.scheduler.registry().link(&self.job_id, chain.id()).await?;
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(StageError::transient("timeout").is_retryable());
        assert!(!StageError::fatal("bad id").is_retryable());
        assert!(!StageError::config("no key").is_retryable());
        assert!(!StageError::not_found("no fr").is_retryable());
        assert!(!StageError::store("redis down").is_retryable());
    }

    #[test]
    fn test_into_job_error_keeps_message_verbatim() {
        let job_error: JobError = StageError::transient("rate limited").into();
        assert_eq!(job_error.kind, ErrorKind::Transient);
        assert_eq!(job_error.message, "rate limited");
    }
}
