//! Remote operation error types.

use thiserror::Error;

use vsum_models::ErrorKind;

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Debug, Error)]
pub enum RemoteError {
    /// The requested resource (e.g. a transcript language) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network failure, rate limit or timeout.
    #[error("Transient error: {0}")]
    Transient(String),

    /// Malformed input or unexpected provider response.
    #[error("Fatal error: {0}")]
    Fatal(String),

    /// Missing credential or tool.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RemoteError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Transient(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RemoteError::NotFound(_) => ErrorKind::NotFound,
            RemoteError::Transient(_) => ErrorKind::Transient,
            RemoteError::Fatal(_) => ErrorKind::Fatal,
            RemoteError::Config(_) => ErrorKind::Config,
        }
    }

    /// Message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            RemoteError::NotFound(m) | RemoteError::Transient(m) | RemoteError::Fatal(m) | RemoteError::Config(m) => m,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() {
            RemoteError::transient(e.to_string())
        } else if e.is_decode() || e.is_body() {
            RemoteError::fatal(format!("Malformed provider response: {}", e))
        } else {
            RemoteError::transient(e.to_string())
        }
    }
}
