//! Compact metadata view handed to the language model.

use crate::vector_store::ChunkMetadata;
use crate::youtube::format_upload_date;
use serde::Serialize;
use serde_json::Value;

/// Video-level facts without the raw yt-dlp document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataView {
    pub youtube_id: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub channel: Option<String>,
    pub speaker: Option<String>,
    pub duration_seconds: Option<f64>,
    pub published_at: Option<String>,
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn raw_text(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).and_then(non_empty)
}

impl MetadataView {
    /// Normalize stored metadata, filling gaps from `raw_meta`.
    pub fn build(youtube_id: &str, meta: &ChunkMetadata) -> Self {
        let raw = &meta.raw_meta;

        let title = non_empty(&meta.title).or_else(|| raw_text(raw, "title"));
        let url = non_empty(&meta.url).or_else(|| raw_text(raw, "webpage_url"));
        let duration_seconds = meta
            .duration_seconds
            .filter(|d| *d != 0.0)
            .or_else(|| raw.get("duration").and_then(Value::as_f64));

        let channel = meta
            .channel
            .as_deref()
            .and_then(non_empty)
            .or_else(|| raw_text(raw, "channel"))
            .or_else(|| raw_text(raw, "uploader"));

        let speaker = raw_text(raw, "speaker")
            .or_else(|| raw_text(raw, "artist"))
            .filter(|s| channel.as_deref() != Some(s.as_str()));

        let published_at = meta
            .published_at
            .as_deref()
            .and_then(non_empty)
            .or_else(|| raw_text(raw, "upload_date").map(|d| format_upload_date(&d)));

        Self {
            youtube_id: youtube_id.to_string(),
            title,
            url,
            channel,
            speaker,
            duration_seconds,
            published_at,
        }
    }
}
