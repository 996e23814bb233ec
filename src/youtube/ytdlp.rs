//! yt-dlp backed video source.

use super::{parse_json3_captions, VideoMetadata, VideoSource};
use crate::error::{EvrikaError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Video source that shells out to yt-dlp.
pub struct YtDlpSource {
    temp_dir: PathBuf,
    audio_quality_kbps: u32,
    caption_languages: Vec<String>,
}

impl YtDlpSource {
    pub fn new(temp_dir: PathBuf, audio_quality_kbps: u32, caption_languages: Vec<String>) -> Self {
        Self {
            temp_dir,
            audio_quality_kbps,
            caption_languages,
        }
    }

    fn tool_error(e: std::io::Error) -> EvrikaError {
        if e.kind() == std::io::ErrorKind::NotFound {
            EvrikaError::ToolNotFound("yt-dlp".to_string())
        } else {
            EvrikaError::VideoSource(format!("Failed to run yt-dlp: {}", e))
        }
    }

    /// Pick the caption file for the most preferred language present in `dir`.
    fn find_caption_file(&self, dir: &Path, youtube_id: &str) -> Option<PathBuf> {
        self.caption_languages
            .iter()
            .map(|lang| dir.join(format!("{}.{}.json3", youtube_id, lang)))
            .find(|p| p.exists())
            .or_else(|| {
                // Auto captions sometimes carry a suffixed language tag (e.g. en-orig)
                std::fs::read_dir(dir).ok()?.flatten().map(|e| e.path()).find(|p| {
                    p.extension().is_some_and(|ext| ext == "json3")
                })
            })
    }
}

#[async_trait]
impl VideoSource for YtDlpSource {
    #[instrument(skip(self))]
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata> {
        let output = Command::new("yt-dlp")
            .args(["--dump-json", "--skip-download", "--no-warnings", "--no-playlist", url])
            .output()
            .await
            .map_err(Self::tool_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EvrikaError::VideoNotFound(format!(
                "{} not found or unavailable: {}",
                url,
                stderr.trim()
            )));
        }

        let raw: serde_json::Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            EvrikaError::VideoSource(format!("Failed to parse yt-dlp output: {}", e))
        })?;

        let fallback_id = super::extract_youtube_id(url).unwrap_or_default();
        Ok(VideoMetadata::from_ytdlp_json(raw, &fallback_id))
    }

    #[instrument(skip(self))]
    async fn fetch_captions(&self, youtube_id: &str) -> Result<Option<String>> {
        std::fs::create_dir_all(&self.temp_dir)?;
        let work_dir = tempfile::tempdir_in(&self.temp_dir)?;
        let template = work_dir.path().join(format!("{}.%(ext)s", youtube_id));
        let url = format!("https://www.youtube.com/watch?v={}", youtube_id);

        let output = Command::new("yt-dlp")
            .arg("--skip-download")
            .arg("--write-subs")
            .arg("--write-auto-subs")
            .arg("--sub-langs").arg(self.caption_languages.join(","))
            .arg("--sub-format").arg("json3")
            .arg("--output").arg(&template)
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(&url)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(Self::tool_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Caption download failed for {}: {}", youtube_id, stderr.trim());
            return Ok(None);
        }

        let Some(path) = self.find_caption_file(work_dir.path(), youtube_id) else {
            info!("No transcript available for {}", youtube_id);
            return Ok(None);
        };

        let text = match parse_json3_captions(&std::fs::read_to_string(&path)?) {
            Ok(text) => text,
            Err(e) => {
                warn!("Unreadable caption file {:?}: {}", path, e);
                return Ok(None);
            }
        };

        if text.trim().is_empty() {
            return Ok(None);
        }

        debug!("Got captions (length={})", text.len());
        Ok(Some(text))
    }

    async fn download_audio(&self, url: &str, youtube_id: &str) -> Result<PathBuf> {
        crate::audio::download_audio(url, youtube_id, &self.temp_dir, self.audio_quality_kbps).await
    }
}
