//! Concrete pipeline stages.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use vsum_models::{JobKind, Language, SummarySettings, VideoId};
use vsum_queue::{RetryPolicy, Stage, StageContext, StageError, StageResult};
use vsum_remote::RemoteError;
use vsum_store::{CachedSummary, StoreError};

use crate::logging::JobLogger;
use crate::orchestrator::PipelineServices;
use crate::plan::{plan_summary_chain, PlannedStage};

fn remote_failure(e: RemoteError) -> StageError {
    StageError::new(e.kind(), e.message())
}

/// Store errors have already been retried at the transport layer.
fn store_failure(e: StoreError) -> StageError {
    StageError::store(e.to_string())
}

/// Build the executable stage for a planned step.
pub(crate) fn build_stage(services: &PipelineServices, planned: PlannedStage) -> Arc<dyn Stage> {
    let policy = services.config.retry_policy(planned.kind());
    match planned {
        PlannedStage::FetchTranscript { video_id, language } => Arc::new(FetchTranscriptStage {
            services: services.clone(),
            video_id,
            language,
            policy,
        }),
        PlannedStage::GenerateSummary { transcript, settings } => Arc::new(GenerateSummaryStage {
            services: services.clone(),
            transcript,
            settings,
            policy,
        }),
        PlannedStage::SaveSummary { video_id, settings } => Arc::new(SaveSummaryStage {
            services: services.clone(),
            video_id,
            settings,
            policy,
        }),
    }
}

/// Fetch a transcript and persist it under the language actually fetched.
///
/// Falls back to English when the requested language is unavailable.
/// Output: `{"transcript": ..., "language": ...}`.
pub struct FetchTranscriptStage {
    services: PipelineServices,
    video_id: VideoId,
    language: Language,
    policy: RetryPolicy,
}

impl FetchTranscriptStage {
    pub(crate) fn new(services: PipelineServices, video_id: VideoId, language: Language) -> Self {
        let policy = services.config.retry_policy(JobKind::FetchTranscript);
        Self {
            services,
            video_id,
            language,
            policy,
        }
    }
}

#[async_trait]
impl Stage for FetchTranscriptStage {
    fn kind(&self) -> JobKind {
        JobKind::FetchTranscript
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.policy.clone()
    }

    async fn run(&self, ctx: &StageContext) -> StageResult {
        let logger = JobLogger::new(&ctx.job_id, self.kind(), ctx.attempt);
        logger.log_start(&format!("{} transcript for {}", self.language, self.video_id));

        let store = &self.services.store;
        if let Some(cached) = store
            .get_transcript(&self.video_id, &self.language)
            .await
            .map_err(store_failure)?
        {
            logger.log_completion("using cached transcript");
            return Ok(json!({ "transcript": cached, "language": self.language }));
        }

        let fetcher = &self.services.fetcher;
        let fetched = match fetcher.fetch_transcript(&self.video_id, &self.language).await {
            Err(e) if e.is_not_found() && !self.language.is_fallback() => {
                logger.log_warning(&format!("{}; falling back to English", e));
                let fallback = Language::fallback();
                if let Some(cached) = store
                    .get_transcript(&self.video_id, &fallback)
                    .await
                    .map_err(store_failure)?
                {
                    logger.log_completion("using cached English transcript");
                    return Ok(json!({ "transcript": cached, "language": fallback }));
                }
                fetcher
                    .fetch_transcript(&self.video_id, &fallback)
                    .await
                    .map_err(remote_failure)?
            }
            other => other.map_err(remote_failure)?,
        };

        store
            .put_transcript(&self.video_id, &fetched.language, &fetched.text)
            .await
            .map_err(store_failure)?;

        logger.log_completion(&format!(
            "stored {} characters under language {}",
            fetched.text.len(),
            fetched.language
        ));
        Ok(json!({ "transcript": fetched.text, "language": fetched.language }))
    }
}

/// Generate a summary from the cached transcript, or from the preceding
/// stage's output. Output: the summary text.
pub struct GenerateSummaryStage {
    services: PipelineServices,
    transcript: Option<String>,
    settings: SummarySettings,
    policy: RetryPolicy,
}

impl GenerateSummaryStage {
    fn transcript<'a>(&'a self, ctx: &'a StageContext) -> Result<&'a str, StageError> {
        if let Some(t) = &self.transcript {
            return Ok(t.as_str());
        }
        ctx.input
            .as_ref()
            .and_then(|input| input.get("transcript").and_then(Value::as_str).or_else(|| input.as_str()))
            .ok_or_else(|| StageError::fatal("No transcript provided to generate_summary"))
    }
}

#[async_trait]
impl Stage for GenerateSummaryStage {
    fn kind(&self) -> JobKind {
        JobKind::GenerateSummary
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.policy.clone()
    }

    async fn run(&self, ctx: &StageContext) -> StageResult {
        let logger = JobLogger::new(&ctx.job_id, self.kind(), ctx.attempt);
        let transcript = self.transcript(ctx)?;
        logger.log_start(&format!(
            "{} summary in {} ({})",
            self.settings.length,
            self.settings.language,
            self.settings.focus_key()
        ));

        let summary = self
            .services
            .generator
            .generate_summary(transcript, &self.settings)
            .await
            .map_err(|e| {
                logger.log_error(&e.to_string());
                remote_failure(e)
            })?;

        logger.log_completion(&format!("{} characters", summary.len()));
        Ok(Value::String(summary))
    }
}

/// Persist a summary under `(video_id, normalized settings)`.
/// Output: `{"summary": ..., "settings": ...}`.
pub struct SaveSummaryStage {
    services: PipelineServices,
    video_id: VideoId,
    settings: SummarySettings,
    policy: RetryPolicy,
}

#[async_trait]
impl Stage for SaveSummaryStage {
    fn kind(&self) -> JobKind {
        JobKind::SaveSummary
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.policy.clone()
    }

    async fn run(&self, ctx: &StageContext) -> StageResult {
        let logger = JobLogger::new(&ctx.job_id, self.kind(), ctx.attempt);
        let summary = ctx
            .input_str()
            .ok_or_else(|| StageError::fatal("No summary provided to save_summary"))?;

        let settings = self.settings.normalized();
        self.services
            .store
            .put_summary(&self.video_id, &settings, summary)
            .await
            .map_err(store_failure)?;

        logger.log_completion(&format!("summary stored for {}", self.video_id));
        let result = CachedSummary {
            summary: summary.to_string(),
            settings,
        };
        serde_json::to_value(result).map_err(|e| StageError::fatal(e.to_string()))
    }
}

/// Inspect the transcript cache and dispatch the matching summary chain.
///
/// The job is linked to the chain it dispatches, so polling it yields the
/// chain's status. Output: `{"chain_id": ..., "plan": [...]}`.
pub struct ProcessVideoStage {
    services: PipelineServices,
    video_id: VideoId,
    settings: SummarySettings,
    policy: RetryPolicy,
}

impl ProcessVideoStage {
    pub(crate) fn new(services: PipelineServices, video_id: VideoId, settings: SummarySettings) -> Self {
        let policy = services.config.retry_policy(JobKind::ProcessVideo);
        Self {
            services,
            video_id,
            settings: settings.normalized(),
            policy,
        }
    }
}

#[async_trait]
impl Stage for ProcessVideoStage {
    fn kind(&self) -> JobKind {
        JobKind::ProcessVideo
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.policy.clone()
    }

    async fn run(&self, ctx: &StageContext) -> StageResult {
        let logger = JobLogger::new(&ctx.job_id, self.kind(), ctx.attempt);
        logger.log_start(&format!("processing video {}", self.video_id));

        let cached_transcript = self
            .services
            .store
            .get_transcript(&self.video_id, &self.settings.language)
            .await
            .map_err(store_failure)?;
        if cached_transcript.is_some() {
            logger.log_progress("using existing transcript");
        }

        let plan = plan_summary_chain(&self.video_id, &self.settings, cached_transcript);
        let plan_json = serde_json::to_value(&plan).map_err(|e| StageError::fatal(e.to_string()))?;
        let stages = plan
            .into_iter()
            .map(|planned| build_stage(&self.services, planned))
            .collect();

        let chain = ctx
            .dispatch_chain(stages)
            .await
            .map_err(|e| StageError::transient(format!("Failed to dispatch chain: {}", e)))?;

        logger.log_completion(&format!("dispatched chain {}", chain.id()));
        Ok(json!({ "chain_id": chain.id(), "plan": plan_json }))
    }
}
