//! Summary request handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use tracing::info;

use vsum_models::{extract_video_id, SummarySettings, VideoId};
use vsum_pipeline::{PipelineError, Submission};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Summary request query parameters.
///
/// `focus_areas` may repeat (`focus_areas=a&focus_areas=b`) or be
/// comma-separated. `url` is only read by `summarize`.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub url: Option<String>,
    pub length: Option<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    pub language: Option<String>,
}

impl SummaryQuery {
    fn focus_areas(&self) -> Vec<&str> {
        self.focus_areas
            .iter()
            .flat_map(|raw| raw.split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn parse(&self) -> ApiResult<SummarySettings> {
        let focus_areas = self.focus_areas();
        SummarySettings::parse(self.length.as_deref(), focus_areas.as_slice(), self.language.as_deref())
            .map_err(|e| ApiError::from(PipelineError::from(e)))
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    /// `completed` or `processing`
    pub status: &'static str,
    pub video_id: VideoId,
    pub settings: SummarySettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
}

impl SummaryResponse {
    fn completed(video_id: VideoId, settings: SummarySettings, summary: String) -> Self {
        Self {
            status: "completed",
            video_id,
            settings,
            result: Some(summary),
            cached: None,
            job_id: None,
            result_url: None,
        }
    }

    fn processing(video_id: VideoId, settings: SummarySettings) -> Self {
        Self {
            status: "processing",
            video_id,
            settings,
            result: None,
            cached: None,
            job_id: None,
            result_url: None,
        }
    }
}

/// Polling URL for a summary; carries the normalized settings.
pub fn summary_result_url(video_id: &VideoId, settings: &SummarySettings) -> String {
    let mut url = format!(
        "/api/result/{}?length={}&language={}",
        video_id,
        settings.length,
        urlencoding::encode(settings.language.as_str())
    );
    for area in &settings.focus_areas {
        url.push_str("&focus_areas=");
        url.push_str(area.as_str());
    }
    url
}

/// `GET /api/summarize?url=&length=&focus_areas=&language=`
///
/// Answers from cache or schedules the summary chain. Settings are
/// validated before anything is dispatched.
pub async fn summarize(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<(StatusCode, Json<SummaryResponse>)> {
    let url = query
        .url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("URL parameter is required"))?;
    let settings = query.parse()?;
    let video_id = extract_video_id(url)?;

    let settings = settings.normalized();
    match state.orchestrator.submit_summary_job(&video_id, &settings).await? {
        Submission::Cached(cached) => {
            metrics::record_cache_response("summarize", true);
            let mut body = SummaryResponse::completed(video_id, cached.settings, cached.summary);
            body.cached = Some(true);
            Ok((StatusCode::OK, Json(body)))
        }
        Submission::Processing { job_id } => {
            metrics::record_cache_response("summarize", false);
            info!(video_id = %video_id, job_id = %job_id, "Summary request accepted");
            let result_url = summary_result_url(&video_id, &settings);
            let mut body = SummaryResponse::processing(video_id, settings);
            body.job_id = Some(job_id.to_string());
            body.result_url = Some(result_url);
            Ok((StatusCode::ACCEPTED, Json(body)))
        }
    }
}

/// `GET /api/result/:video_id?length=&focus_areas=&language=`
///
/// Reads the cache only.
pub async fn get_summary_result(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<(StatusCode, Json<SummaryResponse>)> {
    let video_id = VideoId::from_string(video_id);
    let settings = query.parse()?.normalized();

    match state.orchestrator.cached_summary(&video_id, &settings).await? {
        Some(cached) => Ok((
            StatusCode::OK,
            Json(SummaryResponse::completed(video_id, cached.settings, cached.summary)),
        )),
        None => Ok((StatusCode::ACCEPTED, Json(SummaryResponse::processing(video_id, settings)))),
    }
}
