//! Audio download and processing utilities.
//!
//! Downloads go through yt-dlp; splitting, probing and format conversion go
//! through ffmpeg/ffprobe.

mod downloader;
mod process;

pub use downloader::download_audio;
pub use process::{convert_to_wav, plan_parts, probe_duration, split_audio_by_size, AudioPart};

use crate::error::{EvrikaError, Result};
use std::process::Stdio;
use tokio::process::Command;

/// An ffmpeg command with the flags every invocation shares.
pub(crate) fn ffmpeg() -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y").arg("-loglevel").arg("error").stdout(Stdio::null()).stderr(Stdio::piped());
    cmd
}

/// Run an external tool to completion, mapping spawn and exit failures.
pub(crate) async fn run_tool(mut cmd: Command, name: &str) -> Result<Vec<u8>> {
    let output = match cmd.output().await {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EvrikaError::ToolNotFound(name.to_string()));
        }
        Err(e) => return Err(EvrikaError::ToolFailed(format!("{name}: {e}"))),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EvrikaError::ToolFailed(format!("{name} failed: {}", stderr.trim())));
    }

    Ok(output.stdout)
}
