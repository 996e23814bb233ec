//! Reading ingestion commands and video links out of free-form chat text.

use regex::Regex;
use std::sync::LazyLock;

/// Lines starting with this (case-insensitive) ask for ingestion.
const INGEST_COMMAND: &str = "fetch this video";

static YOUTUBE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(https?://(?:www\.)?(?:youtube\.com/watch\?v=[\w-]+|youtu\.be/[\w-]+)\S*)")
        .expect("Invalid regex")
});

static VIDEO_URL_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[Video URL:\s*(.+?)\s*\]").expect("Invalid regex"));

/// The video URL in a prompt: a `[Video URL: ...]` tag first, else the
/// first YouTube link.
pub fn extract_video_url(prompt: &str) -> Option<String> {
    if let Some(caps) = VIDEO_URL_TAG_RE.captures(prompt) {
        return Some(caps[1].trim().to_string());
    }
    YOUTUBE_URL_RE
        .captures(prompt)
        .map(|caps| caps[1].trim().to_string())
}

/// The URL to ingest when the prompt's last non-empty line is a
/// "Fetch this video" command.
///
/// A link anywhere else in a normal question does not trigger ingestion.
pub fn parse_ingestion_url(prompt: &str) -> Option<String> {
    let last_line = prompt.lines().map(str::trim).filter(|l| !l.is_empty()).last()?;
    if !last_line.to_lowercase().starts_with(INGEST_COMMAND) {
        return None;
    }
    extract_video_url(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingestion_command_on_last_line() {
        assert_eq!(
            parse_ingestion_url("FETCH THIS VIDEO: https://youtu.be/dQw4w9WgXcQ"),
            Some("https://youtu.be/dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            parse_ingestion_url(
                "[Video URL: https://www.youtube.com/watch?v=abc123]\n\nFetch this video please\n  "
            ),
            Some("https://www.youtube.com/watch?v=abc123".to_string())
        );
    }

    #[test]
    fn test_question_with_link_is_not_ingestion() {
        let prompt = "Fetch this video: https://youtu.be/dQw4w9WgXcQ\nwhat is it about?";
        assert_eq!(parse_ingestion_url(prompt), None);
        assert_eq!(parse_ingestion_url(""), None);
        assert_eq!(parse_ingestion_url("fetch this video"), None);
    }

    #[test]
    fn test_extract_video_url() {
        assert_eq!(
            extract_video_url("see https://www.YouTube.com/watch?v=dQw4w9WgXcQ&t=5 and tell me"),
            Some("https://www.YouTube.com/watch?v=dQw4w9WgXcQ&t=5".to_string())
        );
        assert_eq!(
            extract_video_url("[video url:  abcdefghijk ] then https://youtu.be/zzz"),
            Some("abcdefghijk".to_string())
        );
        assert_eq!(extract_video_url("no link here"), None);
    }
}
