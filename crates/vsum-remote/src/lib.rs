//! Remote operations: transcript retrieval and summary generation.
//!
//! Both are black-box providers behind async traits. Every failure is
//! classified as not-found, transient, fatal or configuration so the
//! scheduler can decide whether to retry.

pub mod error;
pub mod openai;
pub mod prompt;
pub mod transcript;

pub use error::{RemoteError, RemoteResult};
pub use openai::{OpenAiConfig, OpenAiSummaryGenerator};
pub use prompt::{build_user_prompt, summary_has_all_fields, SYSTEM_PROMPT};
pub use transcript::{parse_vtt, FetchedTranscript, TranscriptConfig, TranscriptFetcher, YtDlpTranscriptFetcher};

use async_trait::async_trait;
use vsum_models::SummarySettings;

/// Produces a summary of a transcript.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    /// Returns one text block with genre, tone, summary and key takeaway,
    /// written in `settings.language`.
    async fn generate_summary(&self, transcript: &str, settings: &SummarySettings) -> RemoteResult<String>;
}
