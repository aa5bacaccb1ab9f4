//! YouTube URL parsing.

use thiserror::Error;
use url::Url;

use crate::video::VideoId;

/// Errors that can occur during YouTube ID extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum YoutubeIdError {
    #[error("URL is not a valid YouTube URL")]
    InvalidYoutubeUrl,

    #[error("Video ID has invalid format")]
    InvalidVideoId,

    #[error("Video ID not found in URL")]
    VideoIdNotFound,
}

pub type YoutubeIdResult<T> = Result<T, YoutubeIdError>;

const YOUTUBE_HOSTS: [&str; 4] = ["youtube.com", "www.youtube.com", "m.youtube.com", "music.youtube.com"];

/// Extract the video ID from a YouTube URL.
///
/// Supported forms:
/// - `https://www.youtube.com/watch?v=VIDEO_ID`
/// - `https://youtu.be/VIDEO_ID`
/// - `https://youtube.com/embed/VIDEO_ID`
/// - `https://youtube.com/shorts/VIDEO_ID`
///
/// A missing scheme is tolerated (`youtu.be/VIDEO_ID`).
pub fn extract_video_id(raw: &str) -> YoutubeIdResult<VideoId> {
    let raw = raw.trim();
    let parsed = Url::parse(raw)
        .or_else(|_| Url::parse(&format!("https://{}", raw)))
        .map_err(|_| YoutubeIdError::InvalidYoutubeUrl)?;

    let host = parsed
        .host_str()
        .map(str::to_ascii_lowercase)
        .ok_or(YoutubeIdError::InvalidYoutubeUrl)?;

    let candidate = if host == "youtu.be" {
        parsed.path_segments().and_then(|mut s| s.next()).map(str::to_string)
    } else if YOUTUBE_HOSTS.contains(&host.as_str()) {
        let mut segments = parsed.path_segments().into_iter().flatten();
        match segments.next() {
            Some("watch") => parsed
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            Some("embed") | Some("shorts") | Some("v") | Some("live") => segments.next().map(str::to_string),
            _ => None,
        }
    } else {
        return Err(YoutubeIdError::InvalidYoutubeUrl);
    };

    match candidate.filter(|c| !c.is_empty()) {
        Some(id) => validate_video_id(&id).map(|_| VideoId(id)),
        None => Err(YoutubeIdError::VideoIdNotFound),
    }
}

/// YouTube IDs are exactly 11 characters of `[A-Za-z0-9_-]`.
fn validate_video_id(id: &str) -> YoutubeIdResult<()> {
    let valid = id.len() == 11 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(YoutubeIdError::InvalidVideoId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_forms() {
        let cases = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?list=PL123&v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ#t=10",
            "https://youtu.be/dQw4w9WgXcQ?t=30",
            "youtu.be/dQw4w9WgXcQ",
            "https://youtube.com/embed/dQw4w9WgXcQ",
            "https://youtube.com/shorts/dQw4w9WgXcQ",
        ];

        for url in cases {
            assert_eq!(extract_video_id(url).unwrap().as_str(), "dQw4w9WgXcQ", "{}", url);
        }
    }

    #[test]
    fn test_rejects_other_hosts() {
        assert_eq!(
            extract_video_id("https://vimeo.com/watch?v=dQw4w9WgXcQ"),
            Err(YoutubeIdError::InvalidYoutubeUrl)
        );
        assert_eq!(
            extract_video_id("https://notyoutube.com/watch?v=dQw4w9WgXcQ"),
            Err(YoutubeIdError::InvalidYoutubeUrl)
        );
    }

    #[test]
    fn test_rejects_malformed_ids() {
        assert_eq!(
            extract_video_id("https://youtube.com/watch?v=short"),
            Err(YoutubeIdError::InvalidVideoId)
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXc!"),
            Err(YoutubeIdError::InvalidVideoId)
        );
        assert_eq!(
            extract_video_id("https://youtube.com/channel/abc"),
            Err(YoutubeIdError::VideoIdNotFound)
        );
    }
}
