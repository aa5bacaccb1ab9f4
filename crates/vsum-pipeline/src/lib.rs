//! Pipeline orchestrator.
//!
//! Turns transcript and summary requests into cache lookups or scheduled
//! stage chains:
//! - summary cache hit: answered immediately, nothing dispatched
//! - transcript cached: `[generate_summary, save_summary]`
//! - nothing cached: `[fetch_transcript, generate_summary, save_summary]`

pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod plan;
pub mod stages;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::JobLogger;
pub use orchestrator::{Orchestrator, PipelineServices, Submission, TranscriptSubmission};
pub use plan::{plan_summary_chain, PlannedStage};
pub use stages::{FetchTranscriptStage, GenerateSummaryStage, ProcessVideoStage, SaveSummaryStage};
