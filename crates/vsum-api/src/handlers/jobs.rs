//! Job status polling.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use vsum_models::{JobId, JobKind, JobState, JobStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Job status response.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    /// `processing`, `completed` or `failed`
    pub status: &'static str,
    /// Scheduler state: pending, started, retrying, succeeded, failed
    pub state: JobState,
    /// Operation the status refers to; for chains, the failed or final stage
    pub kind: JobKind,
    pub attempt_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    pub updated_at: String,
}

impl JobStatusResponse {
    fn from_status(status: JobStatus) -> (StatusCode, Self) {
        let (code, label) = match status.state {
            JobState::Succeeded => (StatusCode::OK, "completed"),
            JobState::Failed => (StatusCode::INTERNAL_SERVER_ERROR, "failed"),
            JobState::Pending | JobState::Started | JobState::Retrying => (StatusCode::ACCEPTED, "processing"),
        };

        let (error, error_kind) = match (&status.state, status.last_error) {
            (JobState::Failed, Some(e)) => (Some(e.message), Some(e.kind.to_string())),
            _ => (None, None),
        };

        let body = Self {
            job_id: status.job_id.to_string(),
            status: label,
            state: status.state,
            kind: status.kind,
            attempt_count: status.attempt_count,
            result: status.result.filter(|_| status.state == JobState::Succeeded),
            error,
            error_kind,
            updated_at: status.updated_at.to_rfc3339(),
        };
        (code, body)
    }
}

/// `GET /api/jobs/:job_id`
///
/// `202` while in flight, `200` with the result, `500` with the
/// classified error, `404` for unknown or expired IDs.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<(StatusCode, Json<JobStatusResponse>)> {
    let job_id = JobId::from_string(job_id);
    let status = state
        .orchestrator
        .query_job(&job_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Job {} not found", job_id)))?;

    let (code, body) = JobStatusResponse::from_status(status);
    Ok((code, Json(body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vsum_models::{ErrorKind, JobError};

    fn status(state: JobState) -> JobStatus {
        JobStatus {
            job_id: JobId::from_string("job-1"),
            kind: JobKind::FetchTranscript,
            state,
            attempt_count: 3,
            last_error: Some(JobError::new(ErrorKind::Transient, "connection reset")),
            result: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_failed_job_reports_error_kind() {
        let (code, body) = JobStatusResponse::from_status(status(JobState::Failed));

        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.status, "failed");
        assert_eq!(body.error.as_deref(), Some("connection reset"));
        assert_eq!(body.error_kind.as_deref(), Some("transient"));
    }

    #[test]
    fn test_retrying_job_is_processing_without_error() {
        let (code, body) = JobStatusResponse::from_status(status(JobState::Retrying));

        assert_eq!(code, StatusCode::ACCEPTED);
        assert_eq!(body.status, "processing");
        assert!(body.error.is_none());
    }
}
