//! Scheduler metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    pub const JOBS_DISPATCHED_TOTAL: &str = "vsum_jobs_dispatched_total";
    pub const JOBS_SUCCEEDED_TOTAL: &str = "vsum_jobs_succeeded_total";
    pub const JOBS_FAILED_TOTAL: &str = "vsum_jobs_failed_total";
    pub const JOB_RETRIES_TOTAL: &str = "vsum_job_retries_total";
    pub const JOB_DURATION_SECONDS: &str = "vsum_job_duration_seconds";
}

pub fn record_dispatched(kind: &'static str) {
    counter!(names::JOBS_DISPATCHED_TOTAL, "kind" => kind).increment(1);
}

pub fn record_succeeded(kind: &'static str, duration_secs: f64) {
    counter!(names::JOBS_SUCCEEDED_TOTAL, "kind" => kind).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "kind" => kind).record(duration_secs);
}

pub fn record_failed(kind: &'static str, error_kind: &'static str) {
    counter!(names::JOBS_FAILED_TOTAL, "kind" => kind, "error" => error_kind).increment(1);
}

pub fn record_retry(kind: &'static str) {
    counter!(names::JOB_RETRIES_TOTAL, "kind" => kind).increment(1);
}
