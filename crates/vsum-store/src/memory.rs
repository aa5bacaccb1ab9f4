//! In-process cache store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use vsum_models::{Language, SummaryKey, SummarySettings, TranscriptKey, VideoId};

use crate::cache::{CacheStore, CachedSummary, SummaryRecord, TranscriptRecord};
use crate::error::StoreResult;
use crate::metrics::{record_lookup, record_write};

/// Cache store kept in process memory.
///
/// Used by tests and local runs without Redis. Same key normalization and
/// upsert semantics as the Redis backend.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    transcripts: RwLock<HashMap<TranscriptKey, TranscriptRecord>>,
    summaries: RwLock<HashMap<SummaryKey, SummaryRecord>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn transcript_count(&self) -> usize {
        self.transcripts.read().await.len()
    }

    pub async fn summary_count(&self) -> usize {
        self.summaries.read().await.len()
    }

    /// Full transcript record, including `updated_at`.
    pub async fn transcript_record(&self, video_id: &VideoId, language: &Language) -> Option<TranscriptRecord> {
        let key = TranscriptKey::new(video_id.clone(), language.clone());
        self.transcripts.read().await.get(&key).cloned()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get_transcript(&self, video_id: &VideoId, language: &Language) -> StoreResult<Option<String>> {
        let key = TranscriptKey::new(video_id.clone(), language.clone());
        let found = self.transcripts.read().await.get(&key).map(|r| r.transcript.clone());
        record_lookup("transcripts", found.is_some());
        Ok(found)
    }

    async fn put_transcript(&self, video_id: &VideoId, language: &Language, transcript: &str) -> StoreResult<()> {
        let key = TranscriptKey::new(video_id.clone(), language.clone());
        let record = TranscriptRecord {
            video_id: video_id.clone(),
            language: language.clone(),
            transcript: transcript.to_string(),
            updated_at: Utc::now(),
        };
        self.transcripts.write().await.insert(key.clone(), record);
        record_write("transcripts");
        debug!("Stored transcript {}", key);
        Ok(())
    }

    async fn get_summary(
        &self,
        video_id: &VideoId,
        settings: &SummarySettings,
    ) -> StoreResult<Option<CachedSummary>> {
        let key = SummaryKey::new(video_id.clone(), settings);
        let found = self.summaries.read().await.get(&key).cloned().map(CachedSummary::from);
        record_lookup("summaries", found.is_some());
        Ok(found)
    }

    async fn put_summary(&self, video_id: &VideoId, settings: &SummarySettings, summary: &str) -> StoreResult<()> {
        let key = SummaryKey::new(video_id.clone(), settings);
        let record = SummaryRecord {
            video_id: video_id.clone(),
            settings: key.settings.clone(),
            summary: summary.to_string(),
            updated_at: Utc::now(),
        };
        self.summaries.write().await.insert(key.clone(), record);
        record_write("summaries");
        debug!("Stored summary {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsum_models::{FocusArea, SummaryLength};

    fn settings(focus: Vec<FocusArea>) -> SummarySettings {
        SummarySettings {
            length: SummaryLength::Short,
            focus_areas: focus,
            language: Language::default(),
        }
    }

    #[tokio::test]
    async fn test_miss_is_none() {
        let store = MemoryCacheStore::new();
        let video = VideoId::from("abc123");

        assert_eq!(store.get_transcript(&video, &Language::default()).await.unwrap(), None);
        assert_eq!(store.get_summary(&video, &SummarySettings::default()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_transcript_keyed_by_language() {
        let store = MemoryCacheStore::new();
        let video = VideoId::from("abc123");

        store.put_transcript(&video, &Language::new("en"), "hello world").await.unwrap();

        assert_eq!(
            store.get_transcript(&video, &Language::new("en")).await.unwrap().as_deref(),
            Some("hello world")
        );
        assert_eq!(store.get_transcript(&video, &Language::new("fr")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_summary_lookup_normalizes_settings() {
        let store = MemoryCacheStore::new();
        let video = VideoId::from("abc123");

        store
            .put_summary(
                &video,
                &settings(vec![FocusArea::TechnicalDetails, FocusArea::KeyPoints]),
                "summary text",
            )
            .await
            .unwrap();

        let hit = store
            .get_summary(&video, &settings(vec![FocusArea::KeyPoints, FocusArea::TechnicalDetails]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(hit.summary, "summary text");
        assert_eq!(hit.settings.focus_areas, vec![FocusArea::KeyPoints, FocusArea::TechnicalDetails]);
        assert_eq!(store.summary_count().await, 1);
    }

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let store = MemoryCacheStore::new();
        let video = VideoId::from("abc123");
        let s = settings(vec![FocusArea::KeyPoints]);

        store.put_summary(&video, &s, "same").await.unwrap();
        let first = store.get_summary(&video, &s).await.unwrap();
        store.put_summary(&video, &s, "same").await.unwrap();
        let second = store.get_summary(&video, &s).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.summary_count().await, 1);
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let store = MemoryCacheStore::new();
        let video = VideoId::from("abc123");
        let lang = Language::default();

        store.put_transcript(&video, &lang, "first").await.unwrap();
        store.put_transcript(&video, &lang, "second").await.unwrap();

        assert_eq!(store.get_transcript(&video, &lang).await.unwrap().as_deref(), Some("second"));
        assert_eq!(store.transcript_count().await, 1);
    }

    #[tokio::test]
    async fn test_upsert_restamps_updated_at() {
        let store = MemoryCacheStore::new();
        let video = VideoId::from("abc123");
        let lang = Language::default();

        let before = Utc::now();
        store.put_transcript(&video, &lang, "first").await.unwrap();
        let first = store.transcript_record(&video, &lang).await.unwrap();
        assert!(first.updated_at >= before);

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.put_transcript(&video, &lang, "second").await.unwrap();
        let second = store.transcript_record(&video, &lang).await.unwrap();

        assert_eq!(second.transcript, "second");
        assert!(second.updated_at > first.updated_at);
        assert!(store.transcript_record(&video, &Language::new("fr")).await.is_none());
    }
}
