//! Request entry points.

use std::sync::Arc;

use tracing::{info, instrument};

use vsum_models::{JobId, JobStatus, Language, SummarySettings, VideoId};
use vsum_queue::Scheduler;
use vsum_remote::{SummaryGenerator, TranscriptFetcher};
use vsum_store::{CacheStore, CachedSummary};

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::plan::{plan_summary_chain, PlannedStage};
use crate::stages::{FetchTranscriptStage, ProcessVideoStage};

/// Collaborators shared by every stage.
#[derive(Clone)]
pub struct PipelineServices {
    pub store: Arc<dyn CacheStore>,
    pub fetcher: Arc<dyn TranscriptFetcher>,
    pub generator: Arc<dyn SummaryGenerator>,
    pub config: PipelineConfig,
}

impl PipelineServices {
    pub fn new(
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn TranscriptFetcher>,
        generator: Arc<dyn SummaryGenerator>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            generator,
            config,
        }
    }
}

/// Outcome of a summary request.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Answered from the cache; nothing was dispatched.
    Cached(CachedSummary),
    /// Work was scheduled; poll `job_id`.
    Processing { job_id: JobId },
}

/// Outcome of a transcript request.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptSubmission {
    Cached { transcript: String, language: Language },
    Processing { job_id: JobId },
}

/// Turns requests into cache answers or scheduled work.
#[derive(Clone)]
pub struct Orchestrator {
    services: PipelineServices,
    scheduler: Scheduler,
}

impl Orchestrator {
    pub fn new(services: PipelineServices, scheduler: Scheduler) -> Self {
        Self { services, scheduler }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn services(&self) -> &PipelineServices {
        &self.services
    }

    /// Return the cached transcript or schedule a fetch.
    #[instrument(skip_all, fields(video_id = %video_id, language = %language))]
    pub async fn submit_transcript_job(
        &self,
        video_id: &VideoId,
        language: &Language,
    ) -> PipelineResult<TranscriptSubmission> {
        if let Some(transcript) = self.cached_transcript(video_id, language).await? {
            info!("Transcript cache hit");
            return Ok(TranscriptSubmission::Cached {
                transcript,
                language: language.clone(),
            });
        }

        let stage = FetchTranscriptStage::new(self.services.clone(), video_id.clone(), language.clone());
        let handle = self.scheduler.submit(Arc::new(stage)).await?;
        info!(job_id = %handle.id(), "Transcript fetch scheduled");

        Ok(TranscriptSubmission::Processing {
            job_id: handle.id().clone(),
        })
    }

    /// Return the cached summary or schedule the work to produce it.
    ///
    /// Settings are normalized first, so equivalent requests share a cache
    /// entry. A store outage is a dispatch failure, never a miss.
    #[instrument(skip_all, fields(video_id = %video_id))]
    pub async fn submit_summary_job(
        &self,
        video_id: &VideoId,
        settings: &SummarySettings,
    ) -> PipelineResult<Submission> {
        let settings = settings.normalized();

        if let Some(cached) = self.cached_summary(video_id, &settings).await? {
            info!("Summary cache hit");
            return Ok(Submission::Cached(cached));
        }

        let stage = ProcessVideoStage::new(self.services.clone(), video_id.clone(), settings);
        let handle = self.scheduler.submit(Arc::new(stage)).await?;
        info!(job_id = %handle.id(), "Summary processing scheduled");

        Ok(Submission::Processing {
            job_id: handle.id().clone(),
        })
    }

    /// Validate raw request settings, then submit.
    ///
    /// Invalid settings are rejected before anything is looked up or dispatched.
    pub async fn submit_summary_request<S: AsRef<str>>(
        &self,
        video_id: &VideoId,
        length: Option<&str>,
        focus_areas: &[S],
        language: Option<&str>,
    ) -> PipelineResult<Submission> {
        let settings = SummarySettings::parse(length, focus_areas, language)?;
        self.submit_summary_job(video_id, &settings).await
    }

    /// Stages a summary request would dispatch right now.
    pub async fn plan(&self, video_id: &VideoId, settings: &SummarySettings) -> PipelineResult<Vec<PlannedStage>> {
        let settings = settings.normalized();
        let transcript = self.cached_transcript(video_id, &settings.language).await?;
        Ok(plan_summary_chain(video_id, &settings, transcript))
    }

    /// Status of a job or chain; `None` for unknown or expired IDs.
    pub async fn query_job(&self, job_id: &JobId) -> Option<JobStatus> {
        self.scheduler.query(job_id).await
    }

    pub async fn cached_transcript(&self, video_id: &VideoId, language: &Language) -> PipelineResult<Option<String>> {
        Ok(self.services.store.get_transcript(video_id, language).await?)
    }

    pub async fn cached_summary(
        &self,
        video_id: &VideoId,
        settings: &SummarySettings,
    ) -> PipelineResult<Option<CachedSummary>> {
        Ok(self.services.store.get_summary(video_id, settings).await?)
    }
}
