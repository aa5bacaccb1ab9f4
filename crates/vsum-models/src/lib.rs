//! Shared data models for the vsum pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Video identifiers and transcript languages
//! - Summary settings and their normalized cache keys
//! - Job identifiers, kinds, states and pollable status snapshots
//! - YouTube URL parsing

pub mod job;
pub mod keys;
pub mod settings;
pub mod video;
pub mod youtube;

// Re-export common types
pub use job::{ErrorKind, JobError, JobId, JobKind, JobState, JobStatus, TransitionError};
pub use keys::{SummaryKey, TranscriptKey};
pub use settings::{FocusArea, SettingsError, SettingsResult, SummaryLength, SummarySettings};
pub use video::{Language, VideoId};
pub use youtube::{extract_video_id, YoutubeIdError, YoutubeIdResult};
