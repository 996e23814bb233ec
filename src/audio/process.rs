//! Size-based splitting and format conversion.

use super::{ffmpeg, run_tool};
use crate::error::{EvrikaError, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// A time slice of a longer recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioPart {
    pub start_seconds: f64,
    pub length_seconds: f64,
}

/// Plan equal-duration parts so that each part stays under `max_bytes`.
///
/// A file at or below the limit yields a single part covering everything.
pub fn plan_parts(size_bytes: u64, max_bytes: u64, duration_seconds: f64) -> Vec<AudioPart> {
    if size_bytes <= max_bytes || max_bytes == 0 {
        return vec![AudioPart {
            start_seconds: 0.0,
            length_seconds: duration_seconds,
        }];
    }

    let count = size_bytes / max_bytes + 1;
    let part_len = duration_seconds / count as f64;

    (0..count)
        .map(|i| {
            let start = i as f64 * part_len;
            let end = ((i + 1) as f64 * part_len).min(duration_seconds);
            AudioPart {
                start_seconds: start,
                length_seconds: end - start,
            }
        })
        .collect()
}

/// Split `source` into parts no larger than `max_bytes`.
///
/// Returns the source itself when no split is needed. Parts are written to
/// `output_dir` as `<stem>_part<i>.<ext>`.
#[instrument(skip_all, fields(source = %source.display()))]
pub async fn split_audio_by_size(
    source: &Path,
    output_dir: &Path,
    max_bytes: u64,
) -> Result<Vec<PathBuf>> {
    let size = std::fs::metadata(source)?.len();
    if size <= max_bytes {
        return Ok(vec![source.to_path_buf()]);
    }

    info!("File is {} bytes, splitting into parts", size);
    std::fs::create_dir_all(output_dir)?;

    let duration = probe_duration(source).await?;
    let parts = plan_parts(size, max_bytes, duration);

    let stem = source.file_stem().and_then(|s| s.to_str()).unwrap_or("audio");
    let ext = source.extension().and_then(|s| s.to_str()).unwrap_or("mp3");

    let mut paths = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        let dest = output_dir.join(format!("{}_part{}.{}", stem, i, ext));

        let mut cmd = ffmpeg();
        cmd.arg("-ss").arg(format!("{:.3}", part.start_seconds))
            .arg("-i").arg(source)
            .arg("-t").arg(format!("{:.3}", part.length_seconds))
            .arg("-c").arg("copy")
            .arg(&dest);
        run_tool(cmd, "ffmpeg").await?;

        debug!("Created part {} at offset {:.1}s", i, part.start_seconds);
        paths.push(dest);
    }

    info!("Created {} parts", paths.len());
    Ok(paths)
}

/// Queries the duration of an audio file using ffprobe with JSON output.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    let mut cmd = Command::new("ffprobe");
    cmd.arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path);

    let stdout = run_tool(cmd, "ffprobe").await?;

    let parsed: serde_json::Value = serde_json::from_slice(&stdout)
        .map_err(|_| EvrikaError::AudioDownload("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| EvrikaError::AudioDownload("Could not determine audio duration".into()))
}

/// Decode whatever the browser recorded (m4a, webm, ogg ...) into WAV bytes.
///
/// Some recorder encodings are rejected by the transcription API, WAV is not.
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub async fn convert_to_wav(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.is_empty() {
        return Err(EvrikaError::InvalidInput("Empty audio upload".to_string()));
    }
    if is_wav(bytes) {
        return Ok(bytes.to_vec());
    }

    let dir = tempfile::tempdir()?;
    let input = dir.path().join("input");
    let output = dir.path().join("voice.wav");
    tokio::fs::write(&input, bytes).await?;

    let mut cmd = ffmpeg();
    cmd.arg("-i").arg(&input).arg("-vn").arg("-f").arg("wav").arg(&output);
    run_tool(cmd, "ffmpeg").await?;

    Ok(tokio::fs::read(&output).await?)
}

/// RIFF/WAVE container header.
fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wav_upload_passes_through() {
        let wav = b"RIFF\x24\x00\x00\x00WAVEfmt ".to_vec();
        assert_eq!(convert_to_wav(&wav).await.unwrap(), wav);
        assert!(!is_wav(b"ID3\x04webm"));
    }

    #[test]
    fn test_plan_single_part_under_limit() {
        let parts = plan_parts(1_000, 24_000, 600.0);
        assert_eq!(
            parts,
            vec![AudioPart {
                start_seconds: 0.0,
                length_seconds: 600.0
            }]
        );
    }

    #[test]
    fn test_plan_equal_parts_over_limit() {
        // 50 bytes / 24 per part -> 50 / 24 + 1 = 3 parts
        let parts = plan_parts(50, 24, 300.0);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].start_seconds, 0.0);
        assert!((parts[1].start_seconds - 100.0).abs() < 1e-9);
        let total: f64 = parts.iter().map(|p| p.length_seconds).sum();
        assert!((total - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_plan_exact_multiple_adds_part() {
        let parts = plan_parts(48, 24, 90.0);
        assert_eq!(parts.len(), 3);
    }

    #[tokio::test]
    async fn test_small_file_is_not_split() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.mp3");
        std::fs::write(&file, vec![0u8; 16]).unwrap();

        let parts = split_audio_by_size(&file, dir.path(), 1024).await.unwrap();
        assert_eq!(parts, vec![file]);
    }

    #[tokio::test]
    async fn test_convert_rejects_empty_upload() {
        assert!(matches!(convert_to_wav(&[]).await, Err(EvrikaError::InvalidInput(_))));
    }
}
