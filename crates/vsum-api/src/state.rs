//! Application state.

use std::sync::Arc;

use vsum_pipeline::{Orchestrator, PipelineConfig, PipelineServices};
use vsum_queue::{Scheduler, SchedulerConfig};
use vsum_remote::{OpenAiSummaryGenerator, YtDlpTranscriptFetcher};
use vsum_store::{CacheStore, RedisCacheStore};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(config: ApiConfig, orchestrator: Orchestrator) -> Self {
        Self { config, orchestrator }
    }

    /// Wire the Redis store, remote providers and scheduler from the environment.
    ///
    /// Starts the scheduler, so it must run inside the Tokio runtime.
    pub fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let store = RedisCacheStore::from_env()?;
        let fetcher = YtDlpTranscriptFetcher::from_env();
        let generator = OpenAiSummaryGenerator::from_env()?;

        let services = PipelineServices::new(
            Arc::new(store),
            Arc::new(fetcher),
            Arc::new(generator),
            PipelineConfig::from_env(),
        );
        let scheduler = Scheduler::start(SchedulerConfig::from_env());

        Ok(Self::new(config, Orchestrator::new(services, scheduler)))
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.orchestrator.services().store
    }
}
