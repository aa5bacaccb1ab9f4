//! Redis-backed cache store.
//!
//! Each entry is one JSON document stored with `SET`, so an upsert replaces
//! the whole record atomically and concurrent writers to the same key
//! resolve as last-writer-wins.

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use vsum_models::{Language, SummaryKey, SummarySettings, TranscriptKey, VideoId};

use crate::cache::{CacheStore, CachedSummary, SummaryRecord, TranscriptRecord};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::metrics::{record_lookup, record_write};
use crate::retry::{with_retry, RetryConfig};

/// Cache store client.
pub struct RedisCacheStore {
    client: redis::Client,
    key_prefix: String,
    retry: RetryConfig,
}

impl RedisCacheStore {
    /// Create a new store. Does not open a connection yet.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        info!("Cache store configured with key prefix '{}'", config.key_prefix);

        Ok(Self {
            client,
            retry: RetryConfig::from_store_config(&config),
            key_prefix: config.key_prefix,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Self::new(StoreConfig::from_env())
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(key).await?;

        payload
            .map(|raw| serde_json::from_str(&raw).map_err(|e| StoreError::corrupt_record(key, e.to_string())))
            .transpose()
    }

    async fn write<T: Serialize>(&self, key: &str, record: &T) -> StoreResult<()> {
        let payload = serde_json::to_string(record)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(key, payload).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get_transcript(&self, video_id: &VideoId, language: &Language) -> StoreResult<Option<String>> {
        let key = TranscriptKey::new(video_id.clone(), language.clone()).storage_key(&self.key_prefix);
        let record: Option<TranscriptRecord> = with_retry(&self.retry, "get_transcript", || self.read(&key)).await?;

        record_lookup("transcripts", record.is_some());
        Ok(record.map(|r| r.transcript))
    }

    async fn put_transcript(&self, video_id: &VideoId, language: &Language, transcript: &str) -> StoreResult<()> {
        let key = TranscriptKey::new(video_id.clone(), language.clone()).storage_key(&self.key_prefix);
        let record = TranscriptRecord {
            video_id: video_id.clone(),
            language: language.clone(),
            transcript: transcript.to_string(),
            updated_at: Utc::now(),
        };

        with_retry(&self.retry, "put_transcript", || self.write(&key, &record)).await?;
        record_write("transcripts");
        debug!("Stored transcript at {}", key);
        Ok(())
    }

    async fn get_summary(
        &self,
        video_id: &VideoId,
        settings: &SummarySettings,
    ) -> StoreResult<Option<CachedSummary>> {
        let key = SummaryKey::new(video_id.clone(), settings).storage_key(&self.key_prefix);
        let record: Option<SummaryRecord> = with_retry(&self.retry, "get_summary", || self.read(&key)).await?;

        record_lookup("summaries", record.is_some());
        Ok(record.map(CachedSummary::from))
    }

    async fn put_summary(&self, video_id: &VideoId, settings: &SummarySettings, summary: &str) -> StoreResult<()> {
        let summary_key = SummaryKey::new(video_id.clone(), settings);
        let key = summary_key.storage_key(&self.key_prefix);
        let record = SummaryRecord {
            video_id: video_id.clone(),
            settings: summary_key.settings,
            summary: summary.to_string(),
            updated_at: Utc::now(),
        };

        with_retry(&self.retry, "put_summary", || self.write(&key, &record)).await?;
        record_write("summaries");
        debug!("Stored summary at {}", key);
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        with_retry(&self.retry, "ping", || async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            redis::cmd("PING").query_async::<()>(&mut conn).await?;
            Ok(())
        })
        .await
    }
}
