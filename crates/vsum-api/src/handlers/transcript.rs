//! Transcript request handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use vsum_models::{extract_video_id, Language, VideoId};
use vsum_pipeline::{PipelineError, TranscriptSubmission};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TranscriptQuery {
    pub url: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptResultQuery {
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    /// `completed` or `processing`
    pub status: &'static str,
    pub video_id: VideoId,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
}

impl TranscriptResponse {
    fn completed(video_id: VideoId, language: Language, transcript: String) -> Self {
        Self {
            status: "completed",
            video_id,
            language,
            result: Some(transcript),
            cached: None,
            job_id: None,
            result_url: None,
        }
    }

    fn processing(video_id: VideoId, language: Language) -> Self {
        Self {
            status: "processing",
            video_id,
            language,
            result: None,
            cached: None,
            job_id: None,
            result_url: None,
        }
    }
}

fn parse_language(raw: Option<&str>) -> ApiResult<Language> {
    let language = raw
        .map(Language::parse)
        .transpose()
        .map_err(PipelineError::InvalidSettings)?;
    Ok(language.unwrap_or_default())
}

fn transcript_result_url(video_id: &VideoId, language: &Language) -> String {
    format!(
        "/api/transcript/result/{}?language={}",
        video_id,
        urlencoding::encode(language.as_str())
    )
}

/// `GET /api/transcript?url=&language=`
///
/// Answers from cache or schedules a transcript fetch.
pub async fn get_transcript(
    State(state): State<AppState>,
    Query(query): Query<TranscriptQuery>,
) -> ApiResult<(StatusCode, Json<TranscriptResponse>)> {
    let url = query
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("URL parameter is required"))?;
    let video_id = extract_video_id(&url)?;
    let language = parse_language(query.language.as_deref())?;

    let submission = state.orchestrator.submit_transcript_job(&video_id, &language).await?;

    match submission {
        TranscriptSubmission::Cached { transcript, language } => {
            metrics::record_cache_response("transcript", true);
            let mut body = TranscriptResponse::completed(video_id, language, transcript);
            body.cached = Some(true);
            Ok((StatusCode::OK, Json(body)))
        }
        TranscriptSubmission::Processing { job_id } => {
            metrics::record_cache_response("transcript", false);
            info!(video_id = %video_id, job_id = %job_id, "Transcript fetch accepted");
            let mut body = TranscriptResponse::processing(video_id, language);
            body.result_url = Some(transcript_result_url(&body.video_id, &body.language));
            body.job_id = Some(job_id.to_string());
            Ok((StatusCode::ACCEPTED, Json(body)))
        }
    }
}

/// `GET /api/transcript/result/:video_id?language=`
///
/// Reads the cache only.
pub async fn get_transcript_result(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(query): Query<TranscriptResultQuery>,
) -> ApiResult<(StatusCode, Json<TranscriptResponse>)> {
    let video_id = VideoId::from_string(video_id);
    let language = parse_language(query.language.as_deref())?;

    match state.orchestrator.cached_transcript(&video_id, &language).await? {
        Some(transcript) => Ok((
            StatusCode::OK,
            Json(TranscriptResponse::completed(video_id, language, transcript)),
        )),
        None => Ok((
            StatusCode::ACCEPTED,
            Json(TranscriptResponse::processing(video_id, language)),
        )),
    }
}
