//! Video identifier and transcript language.

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::settings::{SettingsError, SettingsResult};

/// Primary subtag plus at most one region or script subtag, lowercased.
static LANGUAGE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2,3}(-[a-z0-9]{2,8})?$").unwrap());

/// Opaque identifier of a source video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Short language code (e.g. "en", "fr").
///
/// Codes are trimmed and lowercased on construction so that "EN" and "en"
/// address the same cache entry. Request input goes through [`Language::parse`],
/// which also restricts the code to `xx` or `xx-yyyy` shapes; the value ends up
/// in cache keys and subtitle tool arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    /// Language used when the requested one is unavailable.
    pub const FALLBACK: &'static str = "en";

    pub fn new(code: impl AsRef<str>) -> Self {
        let code = code.as_ref().trim().to_ascii_lowercase();
        if code.is_empty() {
            Self::default()
        } else {
            Self(code)
        }
    }

    /// Validate a caller-supplied code. Blank input means the fallback.
    pub fn parse(code: &str) -> SettingsResult<Self> {
        let language = Self::new(code);
        if LANGUAGE_CODE.is_match(language.as_str()) {
            Ok(language)
        } else {
            Err(SettingsError::InvalidLanguage(code.to_string()))
        }
    }

    /// The fallback language ("en").
    pub fn fallback() -> Self {
        Self(Self::FALLBACK.to_string())
    }

    pub fn is_fallback(&self) -> bool {
        self.0 == Self::FALLBACK
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::fallback()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Language {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
