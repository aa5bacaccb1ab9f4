//! Pipeline configuration.

use std::time::Duration;

use vsum_models::JobKind;
use vsum_queue::RetryPolicy;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base delay for stage retries
    pub retry_base_delay: Duration,
    /// Cap for stage retry delays
    pub retry_max_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(60),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            retry_base_delay: Duration::from_millis(
                std::env::var("RETRY_BASE_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            retry_max_delay: Duration::from_millis(
                std::env::var("RETRY_MAX_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60_000),
            ),
        }
    }

    /// Budget for `kind` with the configured backoff bounds.
    pub fn retry_policy(&self, kind: JobKind) -> RetryPolicy {
        RetryPolicy::for_kind(kind)
            .with_base_delay(self.retry_base_delay)
            .with_max_delay(self.retry_max_delay)
    }
}
