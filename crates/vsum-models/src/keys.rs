//! Cache keys for transcripts and summaries.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::settings::SummarySettings;
use crate::video::{Language, VideoId};

/// Identity of a cached transcript: `(video_id, language)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranscriptKey {
    pub video_id: VideoId,
    pub language: Language,
}

impl TranscriptKey {
    pub fn new(video_id: VideoId, language: Language) -> Self {
        Self { video_id, language }
    }

    /// Storage key under the given namespace prefix.
    ///
    /// Format: `{prefix}:transcript:{video_id}:{language}`
    pub fn storage_key(&self, prefix: &str) -> String {
        format!("{}:transcript:{}:{}", prefix, self.video_id, self.language)
    }
}

impl fmt::Display for TranscriptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.video_id, self.language)
    }
}

/// Identity of a cached summary: `(video_id, normalized settings)`.
///
/// The settings are normalized on construction, so two keys built from
/// equivalent settings compare equal and render the same storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SummaryKey {
    pub video_id: VideoId,
    pub settings: SummarySettings,
}

impl SummaryKey {
    pub fn new(video_id: VideoId, settings: &SummarySettings) -> Self {
        Self {
            video_id,
            settings: settings.normalized(),
        }
    }

    /// Storage key under the given namespace prefix.
    ///
    /// Format: `{prefix}:summary:{video_id}:{length}:{focus,areas}:{language}`
    pub fn storage_key(&self, prefix: &str) -> String {
        format!(
            "{}:summary:{}:{}:{}:{}",
            prefix,
            self.video_id,
            self.settings.length,
            self.settings.focus_key(),
            self.settings.language
        )
    }
}

impl fmt::Display for SummaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.video_id,
            self.settings.length,
            self.settings.focus_key(),
            self.settings.language
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{FocusArea, SummaryLength};

    #[test]
    fn test_transcript_storage_key() {
        let key = TranscriptKey::new(VideoId::from("abc123"), Language::new("fr"));
        assert_eq!(key.storage_key("vsum"), "vsum:transcript:abc123:fr");
    }

    #[test]
    fn test_summary_key_ignores_focus_order() {
        let a = SummarySettings {
            length: SummaryLength::Short,
            focus_areas: vec![FocusArea::TechnicalDetails, FocusArea::KeyPoints],
            language: Language::default(),
        };
        let b = SummarySettings {
            focus_areas: vec![FocusArea::KeyPoints, FocusArea::TechnicalDetails, FocusArea::KeyPoints],
            ..a.clone()
        };

        let ka = SummaryKey::new(VideoId::from("abc123"), &a);
        let kb = SummaryKey::new(VideoId::from("abc123"), &b);

        assert_eq!(ka, kb);
        assert_eq!(
            ka.storage_key("vsum"),
            "vsum:summary:abc123:short:key_points,technical_details:en"
        );
    }

    #[test]
    fn test_summary_key_differs_by_language() {
        let en = SummarySettings::default();
        let fr = SummarySettings {
            language: Language::new("fr"),
            ..SummarySettings::default()
        };

        assert_ne!(
            SummaryKey::new(VideoId::from("v"), &en).storage_key("p"),
            SummaryKey::new(VideoId::from("v"), &fr).storage_key("p")
        );
    }
}
