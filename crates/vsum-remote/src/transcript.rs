//! Transcript retrieval via yt-dlp.
//!
//! Subtitles (manual or automatic) for exactly one language are downloaded
//! as WebVTT into a scratch directory and flattened to plain text.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, warn};

use vsum_models::{Language, VideoId};

use crate::error::{RemoteError, RemoteResult};

/// A transcript together with the language it was actually fetched in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedTranscript {
    pub text: String,
    pub language: Language,
}

/// Fetches the transcript of a video in one language.
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    /// Returns `RemoteError::NotFound` when the language is unavailable.
    async fn fetch_transcript(&self, video_id: &VideoId, language: &Language) -> RemoteResult<FetchedTranscript>;
}

/// yt-dlp settings.
#[derive(Debug, Clone)]
pub struct TranscriptConfig {
    /// yt-dlp executable
    pub ytdlp_path: PathBuf,
    /// Per-invocation timeout
    pub timeout: Duration,
    /// Parent directory for scratch directories
    pub work_dir: PathBuf,
    /// Optional cookies file passed to yt-dlp
    pub cookies_path: Option<PathBuf>,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: PathBuf::from("yt-dlp"),
            timeout: Duration::from_secs(60),
            work_dir: std::env::temp_dir(),
            cookies_path: None,
        }
    }
}

impl TranscriptConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            ytdlp_path: std::env::var("YTDLP_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ytdlp_path),
            timeout: Duration::from_secs(
                std::env::var("TRANSCRIPT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            cookies_path: std::env::var("YTDLP_COOKIES_PATH").ok().map(PathBuf::from),
        }
    }
}

/// Transcript fetcher backed by the yt-dlp CLI.
pub struct YtDlpTranscriptFetcher {
    config: TranscriptConfig,
}

impl YtDlpTranscriptFetcher {
    pub fn new(config: TranscriptConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(TranscriptConfig::from_env())
    }

    async fn download_subtitles(&self, video_id: &VideoId, language: &Language, dir: &Path) -> RemoteResult<()> {
        let output_template = dir.join("%(id)s").to_string_lossy().into_owned();
        let video_url = format!("https://www.youtube.com/watch?v={}", video_id);

        let mut cmd = tokio::process::Command::new(&self.config.ytdlp_path);
        cmd.args([
            "--write-sub",
            "--write-auto-sub",
            "--sub-lang",
            language.as_str(),
            "--skip-download",
            "--sub-format",
            "vtt",
            "--no-playlist",
            "--output",
            output_template.as_str(),
        ]);
        if let Some(cookies) = &self.config.cookies_path {
            cmd.arg("--cookies").arg(cookies);
        }
        cmd.arg(&video_url).kill_on_drop(true);

        let output = match tokio::time::timeout(self.config.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RemoteError::config_error(format!(
                    "yt-dlp not found at {}",
                    self.config.ytdlp_path.display()
                )));
            }
            Ok(Err(e)) => return Err(RemoteError::transient(format!("Failed to run yt-dlp: {}", e))),
            Err(_) => {
                return Err(RemoteError::transient(format!(
                    "yt-dlp timed out after {:?}",
                    self.config.timeout
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                status = ?output.status.code(),
                error = %stderr.trim(),
                "yt-dlp failed"
            );
            return Err(classify_ytdlp_failure(&stderr));
        }

        Ok(())
    }
}

#[async_trait]
impl TranscriptFetcher for YtDlpTranscriptFetcher {
    async fn fetch_transcript(&self, video_id: &VideoId, language: &Language) -> RemoteResult<FetchedTranscript> {
        info!("Fetching {} transcript for {} using yt-dlp", language, video_id);

        tokio::fs::create_dir_all(&self.config.work_dir)
            .await
            .map_err(|e| RemoteError::config_error(format!("Work dir unavailable: {}", e)))?;
        let scratch = tempfile::Builder::new()
            .prefix("vsum-subs-")
            .tempdir_in(&self.config.work_dir)
            .map_err(|e| RemoteError::transient(format!("Failed to create scratch dir: {}", e)))?;

        self.download_subtitles(video_id, language, scratch.path()).await?;

        let vtt_path = find_vtt_file(scratch.path(), language)
            .await?
            .ok_or_else(|| RemoteError::not_found(format!("No '{}' transcript for video {}", language, video_id)))?;

        let content = tokio::fs::read_to_string(&vtt_path)
            .await
            .map_err(|e| RemoteError::transient(format!("Failed to read VTT file: {}", e)))?;

        let text = parse_vtt(&content);
        if text.is_empty() {
            return Err(RemoteError::not_found(format!(
                "Empty '{}' transcript for video {}",
                language, video_id
            )));
        }

        debug!("Fetched {} characters of transcript for {}", text.len(), video_id);
        Ok(FetchedTranscript {
            text,
            language: language.clone(),
        })
    }
}

/// Map yt-dlp stderr to an error class.
fn classify_ytdlp_failure(stderr: &str) -> RemoteError {
    let lower = stderr.to_lowercase();
    let message = stderr.trim().lines().last().unwrap_or("yt-dlp failed").to_string();

    if lower.contains("incomplete youtube id") || lower.contains("is not a valid url") || lower.contains("unsupported url")
    {
        RemoteError::fatal(message)
    } else if lower.contains("video unavailable") || lower.contains("private video") || lower.contains("has been removed")
    {
        RemoteError::not_found(message)
    } else {
        RemoteError::transient(message)
    }
}

/// Locate the downloaded subtitle file for `language`.
async fn find_vtt_file(dir: &Path, language: &Language) -> RemoteResult<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| RemoteError::transient(format!("Failed to read scratch dir: {}", e)))?;

    let suffix = format!(".{}.vtt", language);
    let mut fallback = None;

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if name.ends_with(&suffix) {
            return Ok(Some(path));
        }
        // Regional variants (en-US) when only those exist
        if name.ends_with(".vtt") && name.contains(&format!(".{}-", language)) {
            fallback = Some(path);
        }
    }

    Ok(fallback)
}

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?:\d{2}:)?\d{2}:\d{2}\.\d{3}\s+-->").expect("valid timestamp regex"))
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag regex"))
}

/// Flatten WebVTT into plain text.
///
/// Cue text lines are joined with single spaces; rolling auto-captions that
/// repeat the previous line are dropped.
pub fn parse_vtt(content: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut in_header = true;

    for raw in content.lines() {
        let line = raw.trim();

        if in_header {
            // Header block runs until the first blank line
            if line.is_empty() {
                in_header = false;
            }
            continue;
        }

        if line.is_empty() || timestamp_pattern().is_match(line) || line.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if line.starts_with("NOTE") || line.starts_with("STYLE") {
            continue;
        }

        let text = tag_pattern().replace_all(line, "");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        if parts.last().map(String::as_str) != Some(text) {
            parts.push(text.to_string());
        }
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "WEBVTT\nKind: captions\nLanguage: en\n\n00:00:00.000 --> 00:00:02.000 align:start position:0%\nhello <c>world</c>\n\n00:00:02.000 --> 00:00:04.000\nhello world\n\n2\n00:00:04.000 --> 00:00:06.000\nsecond line\n";

    #[test]
    fn test_parse_vtt_flattens_and_dedups() {
        assert_eq!(parse_vtt(SAMPLE), "hello world second line");
    }

    #[test]
    fn test_parse_vtt_empty_document() {
        assert_eq!(parse_vtt("WEBVTT\n\n"), "");
    }

    #[test]
    fn test_classify_ytdlp_failure() {
        assert!(matches!(
            classify_ytdlp_failure("ERROR: [youtube] abc: Incomplete YouTube ID abc"),
            RemoteError::Fatal(_)
        ));
        assert!(matches!(
            classify_ytdlp_failure("ERROR: [youtube] x: Video unavailable"),
            RemoteError::NotFound(_)
        ));
        assert!(classify_ytdlp_failure("ERROR: HTTP Error 429: Too Many Requests").is_retryable());
    }

    #[tokio::test]
    async fn test_find_vtt_file_prefers_exact_language() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("abc.en-US.vtt"), "x").await.unwrap();
        tokio::fs::write(dir.path().join("abc.en.vtt"), "y").await.unwrap();

        let found = find_vtt_file(dir.path(), &Language::new("en")).await.unwrap().unwrap();
        assert!(found.ends_with("abc.en.vtt"));

        let missing = find_vtt_file(dir.path(), &Language::new("fr")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_is_config_error() {
        let fetcher = YtDlpTranscriptFetcher::new(TranscriptConfig {
            ytdlp_path: PathBuf::from("/nonexistent/yt-dlp"),
            ..TranscriptConfig::default()
        });

        let err = fetcher
            .fetch_transcript(&VideoId::from("dQw4w9WgXcQ"), &Language::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Config(_)));
    }
}
