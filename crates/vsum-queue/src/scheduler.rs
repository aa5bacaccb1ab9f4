//! Job scheduler.
//!
//! A single FIFO queue feeds a dispatcher that hands each unit to a worker
//! task once a pool permit is available. A failed attempt that will be
//! retried releases its permit and is re-enqueued after its backoff delay.
//! The next stage of a chain is enqueued only after the previous stage
//! succeeded.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use serde_json::Value;
use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{debug, error, info, warn};

use vsum_models::{ErrorKind, JobError, JobId, JobStatus};

use crate::config::SchedulerConfig;
use crate::error::{QueueError, QueueResult};
use crate::handle::{ChainHandle, JobHandle};
use crate::metrics::{record_dispatched, record_failed, record_retry, record_succeeded};
use crate::registry::JobRegistry;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::stage::{Stage, StageContext, StageError};

/// Remaining stages of a chain, carried by the unit currently running.
struct Continuation {
    chain_id: JobId,
    remaining: VecDeque<Arc<dyn Stage>>,
}

struct WorkUnit {
    job_id: JobId,
    stage: Arc<dyn Stage>,
    policy: RetryPolicy,
    input: Option<Value>,
    previous_delay: Option<Duration>,
    continuation: Option<Continuation>,
}

struct Inner {
    config: SchedulerConfig,
    registry: JobRegistry,
    queue: mpsc::UnboundedSender<WorkUnit>,
    shutdown: watch::Sender<bool>,
}

/// Handle to a running scheduler. Cheap to clone.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Start the dispatcher and record sweeper on the current runtime.
    pub fn start(config: SchedulerConfig) -> Self {
        let (queue, queue_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));

        let scheduler = Self {
            inner: Arc::new(Inner {
                config,
                registry: JobRegistry::new(),
                queue,
                shutdown,
            }),
        };

        tokio::spawn(scheduler.clone().dispatch_loop(queue_rx, semaphore));
        tokio::spawn(sweep_loop(
            scheduler.inner.registry.clone(),
            scheduler.inner.config.clone(),
            scheduler.inner.shutdown.subscribe(),
        ));

        scheduler
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.inner.registry
    }

    /// Stop accepting work. Units already running finish; queued units are dropped.
    pub fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    /// Submit a single stage. Returns immediately.
    pub async fn submit(&self, stage: Arc<dyn Stage>) -> QueueResult<JobHandle> {
        let job_id = self.enqueue_stage(stage, None, None).await?;
        Ok(JobHandle::new(job_id, self.inner.registry.clone()))
    }

    /// Submit an ordered chain. Each stage receives the previous stage's
    /// output as its input. Returns immediately.
    pub async fn submit_chain(&self, stages: Vec<Arc<dyn Stage>>) -> QueueResult<ChainHandle> {
        let total = stages.len();
        let mut remaining: VecDeque<Arc<dyn Stage>> = stages.into();
        let first = remaining.pop_front().ok_or(QueueError::EmptyChain)?;
        let terminal_kind = remaining.back().map(|s| s.kind()).unwrap_or_else(|| first.kind());

        let chain_id = JobId::new();
        self.inner.registry.register_chain(&chain_id, terminal_kind, total).await;

        let continuation = Continuation {
            chain_id: chain_id.clone(),
            remaining,
        };
        if let Err(e) = self.enqueue_stage(first, None, Some(continuation)).await {
            self.inner.registry.remove_chain(&chain_id).await;
            return Err(e);
        }

        info!(chain_id = %chain_id, stages = total, "Dispatched chain");
        Ok(ChainHandle::new(chain_id, self.inner.registry.clone()))
    }

    /// Status of a job or chain; `None` if unknown or expired.
    pub async fn query(&self, job_id: &JobId) -> Option<JobStatus> {
        self.inner.registry.query(job_id).await
    }

    /// Handle for an existing job or chain ID.
    pub fn handle(&self, job_id: JobId) -> JobHandle {
        JobHandle::new(job_id, self.inner.registry.clone())
    }

    async fn enqueue_stage(
        &self,
        stage: Arc<dyn Stage>,
        input: Option<Value>,
        continuation: Option<Continuation>,
    ) -> QueueResult<JobId> {
        if self.is_shut_down() {
            return Err(QueueError::ShutDown);
        }

        let job_id = JobId::new();
        let kind = stage.kind();
        self.inner.registry.register_job(&job_id, kind).await;
        if let Some(cont) = &continuation {
            self.inner.registry.push_chain_stage(&cont.chain_id, &job_id).await?;
        }

        let unit = WorkUnit {
            job_id: job_id.clone(),
            policy: stage.retry_policy(),
            stage,
            input,
            previous_delay: None,
            continuation,
        };

        if self.inner.queue.send(unit).is_err() {
            self.inner.registry.remove_job(&job_id).await;
            return Err(QueueError::ShutDown);
        }

        record_dispatched(kind.as_str());
        debug!(job_id = %job_id, operation = %kind, "Enqueued job");
        Ok(job_id)
    }

    async fn dispatch_loop(self, mut queue_rx: mpsc::UnboundedReceiver<WorkUnit>, semaphore: Arc<Semaphore>) {
        info!(
            "Starting scheduler with {} max concurrent jobs",
            self.inner.config.max_concurrent_jobs
        );
        let mut shutdown_rx = self.inner.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping scheduler");
                        break;
                    }
                }
                unit = queue_rx.recv() => {
                    let Some(unit) = unit else { break };

                    let permit = match Arc::clone(&semaphore).acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };

                    let scheduler = self.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        scheduler.execute(unit).await;
                    });
                }
            }
        }

        info!("Scheduler stopped");
    }

    /// Run one attempt of a unit.
    async fn execute(&self, unit: WorkUnit) {
        let kind = unit.stage.kind();
        let attempt = match self.inner.registry.begin_attempt(&unit.job_id).await {
            Ok(attempt) => attempt,
            Err(e) => {
                error!(job_id = %unit.job_id, "Cannot start job: {}", e);
                return;
            }
        };

        info!(job_id = %unit.job_id, operation = %kind, attempt, "Executing job");

        let ctx = StageContext {
            job_id: unit.job_id.clone(),
            attempt,
            input: unit.input.clone(),
            scheduler: self.clone(),
        };

        let started = Instant::now();
        let outcome = AssertUnwindSafe(unit.stage.run(&ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(StageError::fatal(format!("{} stage panicked", kind))));

        match outcome {
            Ok(output) => self.complete(unit, output, started.elapsed()).await,
            Err(error) => self.fail_attempt(unit, attempt, error).await,
        }
    }

    async fn complete(&self, unit: WorkUnit, output: Value, elapsed: Duration) {
        let kind = unit.stage.kind();
        if let Err(e) = self.inner.registry.mark_succeeded(&unit.job_id, output.clone()).await {
            error!(job_id = %unit.job_id, "Failed to record job success: {}", e);
            return;
        }

        record_succeeded(kind.as_str(), elapsed.as_secs_f64());
        info!(job_id = %unit.job_id, operation = %kind, "Job completed successfully");

        let Some(mut continuation) = unit.continuation else {
            return;
        };

        match continuation.remaining.pop_front() {
            Some(next) => {
                let chain_id = continuation.chain_id.clone();
                let next_kind = next.kind();
                if let Err(e) = self.enqueue_stage(next, Some(output), Some(continuation)).await {
                    error!(chain_id = %chain_id, "Failed to enqueue next chain stage: {}", e);
                    let error = JobError::new(ErrorKind::Transient, format!("{} stage not dispatched: {}", next_kind, e));
                    self.inner.registry.abort_chain(&chain_id, next_kind, error).await;
                }
            }
            None => {
                self.inner.registry.finish_chain(&continuation.chain_id).await;
                info!(chain_id = %continuation.chain_id, "Chain completed");
            }
        }
    }

    async fn fail_attempt(&self, unit: WorkUnit, attempt: u32, error: StageError) {
        let kind = unit.stage.kind();

        match unit.policy.decide(attempt, error.clone(), unit.previous_delay) {
            RetryDecision::RetryAfter(delay) => {
                warn!(
                    job_id = %unit.job_id,
                    operation = %kind,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Job failed, retrying: {}",
                    error
                );

                if let Err(e) = self.inner.registry.mark_retrying(&unit.job_id, error.into()).await {
                    error!(job_id = %unit.job_id, "Failed to record retry: {}", e);
                    return;
                }
                record_retry(kind.as_str());

                let queue = self.inner.queue.clone();
                let unit = WorkUnit {
                    previous_delay: Some(delay),
                    ..unit
                };
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if queue.send(unit).is_err() {
                        warn!("Scheduler stopped before retry could be enqueued");
                    }
                });
            }
            RetryDecision::Fail(error) => {
                error!(
                    job_id = %unit.job_id,
                    operation = %kind,
                    attempt,
                    error_kind = %error.kind,
                    "Job failed: {}",
                    error.message
                );

                record_failed(kind.as_str(), error.kind.as_str());
                if let Err(e) = self.inner.registry.mark_failed(&unit.job_id, error.into()).await {
                    error!(job_id = %unit.job_id, "Failed to record job failure: {}", e);
                }

                if let Some(continuation) = unit.continuation {
                    self.inner.registry.finish_chain(&continuation.chain_id).await;
                    info!(
                        chain_id = %continuation.chain_id,
                        skipped = continuation.remaining.len(),
                        "Chain aborted, downstream stages skipped"
                    );
                }
            }
        }
    }
}

async fn sweep_loop(registry: JobRegistry, config: SchedulerConfig, mut shutdown_rx: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(config.gc_interval);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                registry.collect_garbage(config.result_ttl).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use vsum_models::{JobKind, JobState};

    use crate::stage::StageResult;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts)
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5))
    }

    /// Replays scripted outcomes, then echoes its input.
    struct ScriptedStage {
        kind: JobKind,
        policy: RetryPolicy,
        script: Mutex<VecDeque<StageResult>>,
        calls: Arc<AtomicU32>,
    }

    impl ScriptedStage {
        fn new(kind: JobKind, max_attempts: u32, script: Vec<StageResult>) -> (Arc<Self>, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            let stage = Arc::new(Self {
                kind,
                policy: fast_policy(max_attempts),
                script: Mutex::new(script.into()),
                calls: Arc::clone(&calls),
            });
            (stage, calls)
        }
    }

    #[async_trait]
    impl Stage for ScriptedStage {
        fn kind(&self) -> JobKind {
            self.kind
        }

        fn retry_policy(&self) -> RetryPolicy {
            self.policy.clone()
        }

        async fn run(&self, ctx: &StageContext) -> StageResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(ctx.input.clone().unwrap_or(Value::Null)))
        }
    }

    /// Appends a suffix to its string input.
    struct AppendStage(&'static str);

    #[async_trait]
    impl Stage for AppendStage {
        fn kind(&self) -> JobKind {
            JobKind::GenerateSummary
        }

        async fn run(&self, ctx: &StageContext) -> StageResult {
            Ok(Value::from(format!("{}{}", ctx.input_str().unwrap_or(""), self.0)))
        }
    }

    /// Tracks peak concurrency.
    struct SlowStage {
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Stage for SlowStage {
        fn kind(&self) -> JobKind {
            JobKind::FetchTranscript
        }

        async fn run(&self, _ctx: &StageContext) -> StageResult {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(Value::Null)
        }
    }

    fn scheduler(workers: usize) -> Scheduler {
        Scheduler::start(SchedulerConfig::default().with_max_concurrent_jobs(workers))
    }

    #[tokio::test]
    async fn test_single_job_succeeds() {
        let scheduler = scheduler(2);
        let (stage, calls) = ScriptedStage::new(JobKind::SaveSummary, 1, vec![Ok(Value::from("done"))]);

        let handle = scheduler.submit(stage).await.unwrap();
        assert_eq!(handle.wait().await.unwrap(), Value::from("done"));
        assert!(handle.is_ready().await);
        assert!(!handle.is_failed().await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let scheduler = scheduler(1);
        let (stage, calls) = ScriptedStage::new(
            JobKind::FetchTranscript,
            3,
            vec![Err(StageError::transient("timeout")), Ok(Value::from("text"))],
        );

        let handle = scheduler.submit(stage).await.unwrap();
        assert_eq!(handle.wait().await.unwrap(), Value::from("text"));

        let status = handle.status().await.unwrap();
        assert_eq!(status.attempt_count, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fatal_runs_once() {
        let scheduler = scheduler(1);
        let (stage, calls) = ScriptedStage::new(
            JobKind::FetchTranscript,
            3,
            vec![Err(StageError::fatal("malformed video id"))],
        );

        let handle = scheduler.submit(stage).await.unwrap();
        let err = handle.wait().await.unwrap_err();

        assert!(matches!(err, QueueError::JobFailed { ref error, .. } if error.kind == ErrorKind::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.status().await.unwrap().attempt_count, 1);
    }

    #[tokio::test]
    async fn test_transient_exhausts_budget_with_last_error() {
        let scheduler = scheduler(1);
        let (stage, calls) = ScriptedStage::new(
            JobKind::FetchTranscript,
            3,
            vec![
                Err(StageError::transient("t1")),
                Err(StageError::transient("t2")),
                Err(StageError::transient("t3")),
            ],
        );

        let handle = scheduler.submit(stage).await.unwrap();
        let _ = handle.wait().await;

        let status = handle.status().await.unwrap();
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.attempt_count, 3);
        assert_eq!(status.last_error.unwrap().message, "t3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_chain_passes_output_forward() {
        let scheduler = scheduler(2);
        let (first, _) = ScriptedStage::new(JobKind::FetchTranscript, 1, vec![Ok(Value::from("hello"))]);

        let stages: Vec<Arc<dyn Stage>> = vec![first, Arc::new(AppendStage(" world")), Arc::new(AppendStage("!"))];
        let chain = scheduler.submit_chain(stages).await.unwrap();

        assert_eq!(chain.wait().await.unwrap(), Value::from("hello world!"));
        assert_eq!(chain.stage_ids().await.len(), 3);
        assert_eq!(chain.status().await.unwrap().kind, JobKind::GenerateSummary);
    }

    #[tokio::test]
    async fn test_chain_failure_skips_downstream() {
        let scheduler = scheduler(2);
        let (first, _) = ScriptedStage::new(
            JobKind::FetchTranscript,
            3,
            vec![
                Err(StageError::transient("t1")),
                Err(StageError::transient("t2")),
                Err(StageError::transient("t3")),
            ],
        );
        let (second, second_calls) = ScriptedStage::new(JobKind::GenerateSummary, 2, vec![]);
        let (third, third_calls) = ScriptedStage::new(JobKind::SaveSummary, 1, vec![]);

        let stages: Vec<Arc<dyn Stage>> = vec![first, second, third];
        let chain = scheduler.submit_chain(stages).await.unwrap();
        assert!(chain.wait().await.is_err());

        assert!(chain.is_failed().await);
        let status = chain.status().await.unwrap();
        assert_eq!(status.kind, JobKind::FetchTranscript);
        assert_eq!(status.last_error.unwrap().message, "t3");
        assert_eq!(chain.stage_ids().await.len(), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_chain_rejected() {
        let scheduler = scheduler(1);
        assert!(matches!(scheduler.submit_chain(vec![]).await, Err(QueueError::EmptyChain)));
    }

    #[tokio::test]
    async fn test_pool_bounds_concurrency() {
        let scheduler = scheduler(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let stage = Arc::new(SlowStage {
                running: Arc::clone(&running),
                peak: Arc::clone(&peak),
            });
            handles.push(scheduler.submit(stage).await.unwrap());
        }
        for handle in handles {
            handle.wait().await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_backoff_does_not_hold_worker() {
        let scheduler = scheduler(1);
        let slow_retry = RetryPolicy::new(2).with_base_delay(Duration::from_secs(30));
        let calls = Arc::new(AtomicU32::new(0));
        let retrying = Arc::new(ScriptedStage {
            kind: JobKind::GenerateSummary,
            policy: slow_retry,
            script: Mutex::new(vec![Err(StageError::transient("quota"))].into()),
            calls: Arc::clone(&calls),
        });
        let (quick, _) = ScriptedStage::new(JobKind::SaveSummary, 1, vec![Ok(Value::from("quick"))]);

        let first = scheduler.submit(retrying).await.unwrap();
        // Let the first attempt fail and enter backoff
        while first.state().await != Some(JobState::Retrying) {
            tokio::task::yield_now().await;
        }

        let second = scheduler.submit(quick).await.unwrap();
        assert_eq!(second.wait().await.unwrap(), Value::from("quick"));
        assert_eq!(first.state().await, Some(JobState::Retrying));

        first.wait().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_get_result_not_ready() {
        let scheduler = scheduler(1);
        let gate = Arc::new(tokio::sync::Notify::new());

        struct GatedStage(Arc<tokio::sync::Notify>);

        #[async_trait]
        impl Stage for GatedStage {
            fn kind(&self) -> JobKind {
                JobKind::FetchTranscript
            }

            async fn run(&self, _ctx: &StageContext) -> StageResult {
                self.0.notified().await;
                Ok(Value::from("open"))
            }
        }

        let handle = scheduler.submit(Arc::new(GatedStage(Arc::clone(&gate)))).await.unwrap();
        assert!(matches!(handle.get_result().await, Err(QueueError::NotReady(_))));
        assert!(!handle.is_ready().await);

        while handle.state().await != Some(JobState::Started) {
            tokio::task::yield_now().await;
        }
        gate.notify_one();
        assert_eq!(handle.wait().await.unwrap(), Value::from("open"));
    }

    /// Stops the scheduler while running, then succeeds.
    struct ShutdownStage;

    #[async_trait]
    impl Stage for ShutdownStage {
        fn kind(&self) -> JobKind {
            JobKind::FetchTranscript
        }

        async fn run(&self, ctx: &StageContext) -> StageResult {
            ctx.scheduler.shutdown();
            Ok(Value::from("text"))
        }
    }

    #[tokio::test]
    async fn test_chain_fails_when_next_stage_cannot_be_dispatched() {
        let scheduler = scheduler(1);
        let stages: Vec<Arc<dyn Stage>> = vec![Arc::new(ShutdownStage), Arc::new(AppendStage(" world"))];

        let chain = scheduler.submit_chain(stages).await.unwrap();
        let err = tokio::time::timeout(Duration::from_secs(5), chain.wait())
            .await
            .expect("chain never became terminal")
            .unwrap_err();

        assert!(matches!(err, QueueError::JobFailed { ref error, .. } if error.kind == ErrorKind::Transient));
        let status = chain.status().await.unwrap();
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.kind, JobKind::GenerateSummary);
        assert_eq!(chain.stage_ids().await.len(), 1);
    }

    #[tokio::test]
    async fn test_chain_submit_after_shutdown_leaves_no_record() {
        let scheduler = scheduler(1);
        scheduler.shutdown();

        let (stage, _) = ScriptedStage::new(JobKind::SaveSummary, 1, vec![]);
        let stages: Vec<Arc<dyn Stage>> = vec![stage];
        assert!(matches!(scheduler.submit_chain(stages).await, Err(QueueError::ShutDown)));
        assert!(scheduler.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown() {
        let scheduler = scheduler(1);
        scheduler.shutdown();

        let (stage, _) = ScriptedStage::new(JobKind::SaveSummary, 1, vec![]);
        assert!(matches!(scheduler.submit(stage).await, Err(QueueError::ShutDown)));
    }
}
