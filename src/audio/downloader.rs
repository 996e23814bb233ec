//! Audio download via yt-dlp.

use super::{ffmpeg, run_tool};
use crate::error::{EvrikaError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, instrument};

/// Downloads the best audio stream of a video and saves it as MP3.
///
/// Speech-to-text does not need studio quality, so the bitrate is kept modest
/// to keep uploads small. A previously downloaded file is reused.
#[instrument(skip(output_dir), fields(video_id = %video_id))]
pub async fn download_audio(
    url: &str,
    video_id: &str,
    output_dir: &Path,
    quality_kbps: u32,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let target_path = output_dir.join(format!("{}.mp3", video_id));

    if target_path.exists() {
        info!("Using cached audio file");
        return Ok(target_path);
    }

    info!("Downloading audio from {}", url);

    let template = output_dir.join(format!("{}.%(ext)s", video_id));

    let result = Command::new("yt-dlp")
        .arg("--format").arg("bestaudio/best")
        .arg("--extract-audio")
        .arg("--audio-format").arg("mp3")
        .arg("--audio-quality").arg(format!("{}K", quality_kbps))
        .arg("--output").arg(&template)
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EvrikaError::ToolNotFound("yt-dlp".into()));
        }
        Err(e) => {
            return Err(EvrikaError::AudioDownload(format!("yt-dlp execution failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EvrikaError::AudioDownload(format!("yt-dlp failed: {stderr}")));
    }

    let downloaded = find_audio_file(output_dir, video_id)?;

    if downloaded != target_path {
        let mut cmd = ffmpeg();
        cmd.arg("-i").arg(&downloaded)
            .arg("-vn")
            .arg("-codec:a").arg("libmp3lame")
            .arg("-b:a").arg(format!("{}k", quality_kbps))
            .arg(&target_path);
        run_tool(cmd, "ffmpeg").await?;
        let _ = std::fs::remove_file(&downloaded);
    }

    Ok(target_path)
}

/// Locates a downloaded audio file by video ID.
fn find_audio_file(dir: &Path, video_id: &str) -> Result<PathBuf> {
    for ext in &["mp3", "opus", "m4a", "webm", "ogg"] {
        let candidate = dir.join(format!("{}.{}", video_id, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| EvrikaError::AudioDownload(format!("Cannot read directory: {e}")))?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(video_id) {
            return Ok(entry.path());
        }
    }

    Err(EvrikaError::AudioDownload("Audio file not found after download".into()))
}
