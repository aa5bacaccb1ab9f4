//! Cache store for transcripts and summaries.
//!
//! This crate provides:
//! - The `CacheStore` trait (get/put for both collections, upsert semantics)
//! - `RedisCacheStore`, the durable networked backend
//! - `MemoryCacheStore`, an in-process backend for tests and local runs
//! - Transport-level retry for connectivity failures

pub mod cache;
pub mod config;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod redis_store;
pub mod retry;

pub use cache::{CacheStore, CachedSummary, SummaryRecord, TranscriptRecord};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryCacheStore;
pub use redis_store::RedisCacheStore;
pub use retry::{with_retry, RetryConfig};
