//! Structured stage logging.

use tracing::{error, info, warn};
use vsum_models::{JobId, JobKind};

/// Logger bound to one job attempt.
///
/// Every line carries `job_id`, `operation` and `attempt` fields.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: &'static str,
    attempt: u32,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: JobKind, attempt: u32) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.as_str(),
            attempt,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            attempt = self.attempt,
            "Stage started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            attempt = self.attempt,
            "Stage progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = self.operation,
            attempt = self.attempt,
            "Stage warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = self.operation,
            attempt = self.attempt,
            "Stage error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            attempt = self.attempt,
            "Stage completed: {}", message
        );
    }
}
