//! YouTube video identification, metadata and captions.

mod captions;
mod ytdlp;

pub use captions::parse_json3_captions;
pub use ytdlp::YtDlpSource;

use crate::error::{EvrikaError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata about a video as reported by yt-dlp.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub webpage_url: Option<String>,
    pub channel: Option<String>,
    pub uploader: Option<String>,
    /// Performer credited by the platform, if any.
    pub artist: Option<String>,
    pub duration_seconds: Option<f64>,
    /// Upload date as `YYYYMMDD`.
    pub upload_date: Option<String>,
    /// The complete yt-dlp JSON document.
    pub raw: serde_json::Value,
}

impl VideoMetadata {
    /// Build metadata from a `yt-dlp --dump-json` document.
    pub fn from_ytdlp_json(raw: serde_json::Value, fallback_id: &str) -> Self {
        let text = |key: &str| raw[key].as_str().filter(|s| !s.is_empty()).map(str::to_string);

        Self {
            id: text("id").unwrap_or_else(|| fallback_id.to_string()),
            title: text("title").unwrap_or_default(),
            webpage_url: text("webpage_url"),
            channel: text("channel"),
            uploader: text("uploader"),
            artist: text("artist"),
            duration_seconds: raw["duration"].as_f64(),
            upload_date: text("upload_date"),
            raw,
        }
    }

    /// Channel name, falling back to the uploader.
    pub fn channel_or_uploader(&self) -> Option<String> {
        self.channel.clone().or_else(|| self.uploader.clone())
    }

    /// Publication date as `YYYY-MM-DD` when the upload date is well formed.
    pub fn published_at(&self) -> Option<String> {
        self.upload_date.as_deref().map(format_upload_date)
    }
}

/// Convert a `YYYYMMDD` upload date into `YYYY-MM-DD`; anything else is returned unchanged.
pub fn format_upload_date(upload_date: &str) -> String {
    if upload_date.len() == 8 && upload_date.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &upload_date[0..4], &upload_date[4..6], &upload_date[6..8])
    } else {
        upload_date.to_string()
    }
}

/// Canonical short link for a video id.
pub fn short_url(youtube_id: &str) -> String {
    format!("https://youtu.be/{}", youtube_id)
}

/// Extract a YouTube video ID from a bare 11-character ID, a full YouTube URL,
/// or a youtu.be short URL.
pub fn extract_youtube_id(url_or_id: &str) -> Result<String> {
    if url_or_id.is_empty() {
        return Err(EvrikaError::InvalidInput("Empty YouTube URL/ID".to_string()));
    }

    if url_or_id.chars().count() == 11 && !url_or_id.contains('/') && !url_or_id.contains('?') {
        return Ok(url_or_id.to_string());
    }

    let not_found =
        || EvrikaError::InvalidInput(format!("Could not extract YouTube ID from: {}", url_or_id));

    let parsed = url::Url::parse(url_or_id).map_err(|_| not_found())?;

    if parsed.host_str() == Some("youtu.be") {
        let id = parsed.path().trim_start_matches('/');
        if !id.is_empty() {
            return Ok(id.to_string());
        }
    }

    if let Some((_, v)) = parsed.query_pairs().find(|(k, v)| k == "v" && !v.is_empty()) {
        return Ok(v.into_owned());
    }

    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .ok_or_else(not_found)
}

/// Where videos come from: metadata, published captions and raw audio.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Fetch metadata without downloading media.
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata>;

    /// Published or auto-generated captions as plain text, if any exist.
    async fn fetch_captions(&self, youtube_id: &str) -> Result<Option<String>>;

    /// Download the audio track and return the local file.
    async fn download_audio(&self, url: &str, youtube_id: &str) -> Result<PathBuf>;
}
