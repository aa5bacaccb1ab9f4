//! Job and chain tracking records.
//!
//! Every job gets a record on submission. Chains get their own record that
//! lists the stage jobs dispatched so far. Terminal records are swept after
//! the configured TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{Notify, RwLock};
use tokio::time::Instant;
use tracing::debug;

use vsum_models::{JobError, JobId, JobKind, JobState, JobStatus};

use crate::error::{QueueError, QueueResult};

#[derive(Debug, Clone)]
struct JobRecord {
    kind: JobKind,
    state: JobState,
    attempt_count: u32,
    last_error: Option<JobError>,
    result: Option<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    finished_at: Option<Instant>,
    /// Chain dispatched by this job
    linked_chain: Option<JobId>,
}

impl JobRecord {
    fn status(&self, job_id: &JobId) -> JobStatus {
        JobStatus {
            job_id: job_id.clone(),
            kind: self.kind,
            state: self.state,
            attempt_count: self.attempt_count,
            last_error: self.last_error.clone(),
            result: self.result.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Stage that could not be dispatched, ending the chain.
#[derive(Debug, Clone)]
struct ChainAbort {
    kind: JobKind,
    error: JobError,
    at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ChainRecord {
    /// Kind of the final stage
    terminal_kind: JobKind,
    total_stages: usize,
    stages: Vec<JobId>,
    aborted: Option<ChainAbort>,
    created_at: DateTime<Utc>,
    finished_at: Option<Instant>,
}

#[derive(Default)]
struct Records {
    jobs: HashMap<JobId, JobRecord>,
    chains: HashMap<JobId, ChainRecord>,
}

/// Shared registry of job records. Cheap to clone.
#[derive(Clone, Default)]
pub struct JobRegistry {
    records: Arc<RwLock<Records>>,
    changed: Arc<Notify>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pending job record.
    pub(crate) async fn register_job(&self, job_id: &JobId, kind: JobKind) {
        let now = Utc::now();
        let record = JobRecord {
            kind,
            state: JobState::Pending,
            attempt_count: 0,
            last_error: None,
            result: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
            linked_chain: None,
        };
        self.records.write().await.jobs.insert(job_id.clone(), record);
    }

    pub(crate) async fn remove_job(&self, job_id: &JobId) {
        self.records.write().await.jobs.remove(job_id);
    }

    pub(crate) async fn register_chain(&self, chain_id: &JobId, terminal_kind: JobKind, total_stages: usize) {
        let record = ChainRecord {
            terminal_kind,
            total_stages,
            stages: Vec::with_capacity(total_stages),
            aborted: None,
            created_at: Utc::now(),
            finished_at: None,
        };
        self.records.write().await.chains.insert(chain_id.clone(), record);
    }

    pub(crate) async fn remove_chain(&self, chain_id: &JobId) {
        self.records.write().await.chains.remove(chain_id);
    }

    pub(crate) async fn push_chain_stage(&self, chain_id: &JobId, job_id: &JobId) -> QueueResult<()> {
        let mut records = self.records.write().await;
        let chain = records
            .chains
            .get_mut(chain_id)
            .ok_or_else(|| QueueError::job_not_found(chain_id.as_str()))?;
        chain.stages.push(job_id.clone());
        Ok(())
    }

    pub(crate) async fn finish_chain(&self, chain_id: &JobId) {
        if let Some(chain) = self.records.write().await.chains.get_mut(chain_id) {
            chain.finished_at = Some(Instant::now());
        }
        self.changed.notify_waiters();
    }

    /// End a chain whose next stage could not be dispatched. The chain then
    /// reports `failed` with the undispatched stage's kind.
    pub(crate) async fn abort_chain(&self, chain_id: &JobId, kind: JobKind, error: JobError) {
        if let Some(chain) = self.records.write().await.chains.get_mut(chain_id) {
            chain.aborted = Some(ChainAbort {
                kind,
                error,
                at: Utc::now(),
            });
            chain.finished_at = Some(Instant::now());
        }
        self.changed.notify_waiters();
    }

    /// Point `job_id` at the chain it dispatched.
    pub async fn link(&self, job_id: &JobId, chain_id: &JobId) -> QueueResult<()> {
        let mut records = self.records.write().await;
        let job = records
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| QueueError::job_not_found(job_id.as_str()))?;
        job.linked_chain = Some(chain_id.clone());
        Ok(())
    }

    /// Move to `started` and count the attempt. Returns the attempt number.
    pub(crate) async fn begin_attempt(&self, job_id: &JobId) -> QueueResult<u32> {
        let attempt = self
            .update(job_id, JobState::Started, |job| {
                job.attempt_count += 1;
            })
            .await?;
        Ok(attempt)
    }

    pub(crate) async fn mark_retrying(&self, job_id: &JobId, error: JobError) -> QueueResult<()> {
        self.update(job_id, JobState::Retrying, |job| job.last_error = Some(error))
            .await
            .map(|_| ())
    }

    pub(crate) async fn mark_succeeded(&self, job_id: &JobId, result: Value) -> QueueResult<()> {
        self.update(job_id, JobState::Succeeded, |job| {
            job.result = Some(result);
            job.finished_at = Some(Instant::now());
        })
        .await?;
        self.changed.notify_waiters();
        Ok(())
    }

    pub(crate) async fn mark_failed(&self, job_id: &JobId, error: JobError) -> QueueResult<()> {
        self.update(job_id, JobState::Failed, |job| {
            job.last_error = Some(error);
            job.finished_at = Some(Instant::now());
        })
        .await?;
        self.changed.notify_waiters();
        Ok(())
    }

    /// Apply a checked state transition plus a field update.
    async fn update<F>(&self, job_id: &JobId, next: JobState, apply: F) -> QueueResult<u32>
    where
        F: FnOnce(&mut JobRecord),
    {
        let mut records = self.records.write().await;
        let job = records
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| QueueError::job_not_found(job_id.as_str()))?;

        job.state = job.state.transition(next)?;
        apply(job);
        job.updated_at = Utc::now();
        Ok(job.attempt_count)
    }

    /// Current status of a job or chain.
    ///
    /// A job that dispatched a chain resolves to that chain once it has
    /// succeeded. A chain reports its first failed stage if any, otherwise
    /// the state of its final stage.
    pub async fn query(&self, job_id: &JobId) -> Option<JobStatus> {
        let records = self.records.read().await;

        if let Some(job) = records.jobs.get(job_id) {
            if let (JobState::Succeeded, Some(chain_id)) = (job.state, &job.linked_chain) {
                if let Some(mut status) = chain_status(&records, chain_id) {
                    status.job_id = job_id.clone();
                    return Some(status);
                }
            }
            return Some(job.status(job_id));
        }

        chain_status(&records, job_id)
    }

    /// Stage job IDs dispatched so far for a chain.
    pub async fn chain_stages(&self, chain_id: &JobId) -> Option<Vec<JobId>> {
        self.records.read().await.chains.get(chain_id).map(|c| c.stages.clone())
    }

    /// Wait until the job or chain is terminal.
    pub async fn wait_terminal(&self, job_id: &JobId) -> QueueResult<JobStatus> {
        loop {
            let notified = self.changed.notified();
            match self.query(job_id).await {
                Some(status) if status.state.is_terminal() => return Ok(status),
                Some(_) => notified.await,
                None => return Err(QueueError::job_not_found(job_id.as_str())),
            }
        }
    }

    /// Drop terminal records that finished more than `ttl` ago.
    pub async fn collect_garbage(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let expired = |finished: Option<Instant>| finished.is_some_and(|at| now.duration_since(at) >= ttl);

        let mut records = self.records.write().await;
        let before = records.jobs.len() + records.chains.len();

        records.jobs.retain(|_, job| !expired(job.finished_at));
        records.chains.retain(|_, chain| !expired(chain.finished_at));

        let removed = before - (records.jobs.len() + records.chains.len());
        if removed > 0 {
            debug!("Collected {} expired job records", removed);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        let records = self.records.read().await;
        records.jobs.len() + records.chains.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn chain_status(records: &Records, chain_id: &JobId) -> Option<JobStatus> {
    let chain = records.chains.get(chain_id)?;
    let stages: Vec<&JobRecord> = chain.stages.iter().filter_map(|id| records.jobs.get(id)).collect();

    if let Some(failed) = stages.iter().find(|job| job.state == JobState::Failed) {
        let mut status = failed.status(chain_id);
        status.result = None;
        return Some(status);
    }

    if let Some(abort) = &chain.aborted {
        return Some(JobStatus {
            job_id: chain_id.clone(),
            kind: abort.kind,
            state: JobState::Failed,
            attempt_count: 0,
            last_error: Some(abort.error.clone()),
            result: None,
            created_at: chain.created_at,
            updated_at: abort.at,
        });
    }

    let all_dispatched = chain.stages.len() == chain.total_stages;
    match stages.last() {
        Some(last) if all_dispatched => Some(last.status(chain_id)),
        Some(current) => {
            // An intermediate stage that succeeded is about to hand over
            let state = match current.state {
                JobState::Started | JobState::Retrying => current.state,
                _ => JobState::Pending,
            };
            Some(JobStatus {
                job_id: chain_id.clone(),
                kind: chain.terminal_kind,
                state,
                attempt_count: 0,
                last_error: None,
                result: None,
                created_at: chain.created_at,
                updated_at: current.updated_at,
            })
        }
        None => Some(JobStatus {
            job_id: chain_id.clone(),
            kind: chain.terminal_kind,
            state: JobState::Pending,
            attempt_count: 0,
            last_error: None,
            result: None,
            created_at: chain.created_at,
            updated_at: chain.created_at,
        }),
    }
}
