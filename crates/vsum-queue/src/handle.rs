//! Handles returned on submission.

use serde_json::Value;

use vsum_models::{JobId, JobState, JobStatus};

use crate::error::{QueueError, QueueResult};
use crate::registry::JobRegistry;

/// Handle to a submitted job.
#[derive(Clone)]
pub struct JobHandle {
    id: JobId,
    registry: JobRegistry,
}

impl JobHandle {
    pub(crate) fn new(id: JobId, registry: JobRegistry) -> Self {
        Self { id, registry }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Current snapshot; `None` once the record has expired.
    pub async fn status(&self) -> Option<JobStatus> {
        self.registry.query(&self.id).await
    }

    pub async fn state(&self) -> Option<JobState> {
        self.status().await.map(|s| s.state)
    }

    pub async fn is_ready(&self) -> bool {
        self.state().await.is_some_and(|s| s.is_terminal())
    }

    pub async fn is_failed(&self) -> bool {
        self.state().await == Some(JobState::Failed)
    }

    /// Result of a succeeded job.
    ///
    /// Errors with `NotReady` while the job is in flight and `JobFailed`
    /// when it ended in failure.
    pub async fn get_result(&self) -> QueueResult<Value> {
        let status = self
            .status()
            .await
            .ok_or_else(|| QueueError::job_not_found(self.id.as_str()))?;
        result_of(status)
    }

    /// Wait for a terminal state, then return the result.
    pub async fn wait(&self) -> QueueResult<Value> {
        let status = self.registry.wait_terminal(&self.id).await?;
        result_of(status)
    }
}

/// Handle to a submitted chain.
///
/// Reports the first failed stage if any, otherwise the final stage.
#[derive(Clone)]
pub struct ChainHandle {
    inner: JobHandle,
}

impl ChainHandle {
    pub(crate) fn new(id: JobId, registry: JobRegistry) -> Self {
        Self {
            inner: JobHandle::new(id, registry),
        }
    }

    pub fn id(&self) -> &JobId {
        self.inner.id()
    }

    /// Stage job IDs dispatched so far, in order.
    pub async fn stage_ids(&self) -> Vec<JobId> {
        self.inner.registry.chain_stages(self.id()).await.unwrap_or_default()
    }

    pub async fn status(&self) -> Option<JobStatus> {
        self.inner.status().await
    }

    pub async fn state(&self) -> Option<JobState> {
        self.inner.state().await
    }

    pub async fn is_ready(&self) -> bool {
        self.inner.is_ready().await
    }

    pub async fn is_failed(&self) -> bool {
        self.inner.is_failed().await
    }

    pub async fn get_result(&self) -> QueueResult<Value> {
        self.inner.get_result().await
    }

    pub async fn wait(&self) -> QueueResult<Value> {
        self.inner.wait().await
    }
}

fn result_of(status: JobStatus) -> QueueResult<Value> {
    match status.state {
        JobState::Succeeded => Ok(status.result.unwrap_or(Value::Null)),
        JobState::Failed => Err(QueueError::JobFailed {
            job_id: status.job_id.to_string(),
            error: status
                .last_error
                .unwrap_or_else(|| vsum_models::JobError::new(vsum_models::ErrorKind::Fatal, "unknown error")),
        }),
        _ => Err(QueueError::not_ready(status.job_id.as_str())),
    }
}
