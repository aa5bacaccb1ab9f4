//! Pipeline error types.

use thiserror::Error;

use vsum_models::{SettingsError, YoutubeIdError};
use vsum_queue::QueueError;
use vsum_store::StoreError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    #[error("Invalid video URL: {0}")]
    InvalidVideo(#[from] YoutubeIdError),

    /// The cache store was unreachable; surfaced as a dispatch failure, never as a miss.
    #[error("Dispatch failed, cache store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Dispatch failed: {0}")]
    Queue(#[from] QueueError),
}

impl PipelineError {
    /// Caller supplied bad input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::InvalidSettings(_) | PipelineError::InvalidVideo(_))
    }
}
