//! Stage planning for summary requests.

use serde::Serialize;

use vsum_models::{JobKind, Language, SummarySettings, VideoId};

/// One step of a summary chain, with its own arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum PlannedStage {
    FetchTranscript {
        video_id: VideoId,
        language: Language,
    },
    /// `transcript` is set when it was already cached; otherwise the
    /// stage takes it from the preceding fetch.
    GenerateSummary {
        #[serde(skip)]
        transcript: Option<String>,
        settings: SummarySettings,
    },
    SaveSummary {
        video_id: VideoId,
        settings: SummarySettings,
    },
}

impl PlannedStage {
    pub fn kind(&self) -> JobKind {
        match self {
            PlannedStage::FetchTranscript { .. } => JobKind::FetchTranscript,
            PlannedStage::GenerateSummary { .. } => JobKind::GenerateSummary,
            PlannedStage::SaveSummary { .. } => JobKind::SaveSummary,
        }
    }
}

/// Chain for a summary whose summary cache missed.
///
/// With a cached transcript the fetch is skipped.
pub fn plan_summary_chain(
    video_id: &VideoId,
    settings: &SummarySettings,
    cached_transcript: Option<String>,
) -> Vec<PlannedStage> {
    let settings = settings.normalized();
    let save = PlannedStage::SaveSummary {
        video_id: video_id.clone(),
        settings: settings.clone(),
    };

    match cached_transcript {
        Some(transcript) => vec![
            PlannedStage::GenerateSummary {
                transcript: Some(transcript),
                settings,
            },
            save,
        ],
        None => vec![
            PlannedStage::FetchTranscript {
                video_id: video_id.clone(),
                language: settings.language.clone(),
            },
            PlannedStage::GenerateSummary {
                transcript: None,
                settings,
            },
            save,
        ],
    }
}
