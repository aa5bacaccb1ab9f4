//! Cache store error types.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a cache store.
///
/// A cache miss is never an error; lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Corrupt record at {key}: {message}")]
    CorruptRecord { key: String, message: String },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    pub fn corrupt_record(key: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::CorruptRecord {
            key: key.into(),
            message: msg.into(),
        }
    }

    /// Connectivity failures are retried at the transport layer.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::ConnectionFailed(_) => true,
            StoreError::Redis(e) => {
                e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
            }
            StoreError::CorruptRecord { .. } | StoreError::Json(_) => false,
        }
    }
}
