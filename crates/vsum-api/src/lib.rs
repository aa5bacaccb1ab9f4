//! Axum HTTP API server.
//!
//! A thin layer over the pipeline orchestrator:
//! - transcript and summary requests answered from cache or scheduled
//! - job status polling
//! - health, readiness and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
