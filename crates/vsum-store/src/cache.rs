//! Cache store contract and persisted record shapes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vsum_models::{Language, SummarySettings, VideoId};

use crate::error::StoreResult;

/// Persisted transcript, keyed by `(video_id, language)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub video_id: VideoId,
    pub language: Language,
    pub transcript: String,
    pub updated_at: DateTime<Utc>,
}

/// Persisted summary, keyed by `(video_id, normalized settings)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub video_id: VideoId,
    pub settings: SummarySettings,
    pub summary: String,
    pub updated_at: DateTime<Utc>,
}

/// A summary as returned to callers: the text and the normalized settings
/// it was produced with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSummary {
    pub summary: String,
    pub settings: SummarySettings,
}

impl From<SummaryRecord> for CachedSummary {
    fn from(record: SummaryRecord) -> Self {
        Self {
            summary: record.summary,
            settings: record.settings,
        }
    }
}

/// Durable memo of transcripts and summaries.
///
/// Implementations must be safe for concurrent use. Writes are upserts on
/// the normalized key: the last writer wins and a single write is atomic.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a transcript. A miss is `Ok(None)`.
    async fn get_transcript(&self, video_id: &VideoId, language: &Language) -> StoreResult<Option<String>>;

    /// Insert or replace the transcript for `(video_id, language)`.
    async fn put_transcript(&self, video_id: &VideoId, language: &Language, transcript: &str) -> StoreResult<()>;

    /// Look up a summary. Settings are normalized before lookup.
    async fn get_summary(
        &self,
        video_id: &VideoId,
        settings: &SummarySettings,
    ) -> StoreResult<Option<CachedSummary>>;

    /// Insert or replace the summary for `(video_id, normalized settings)`.
    async fn put_summary(&self, video_id: &VideoId, settings: &SummarySettings, summary: &str) -> StoreResult<()>;

    /// Connectivity probe used by readiness checks.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
