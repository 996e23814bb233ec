//! OpenAI Whisper transcription implementation.

use super::Transcriber;
use crate::audio::split_audio_by_size;
use crate::error::{EvrikaError, Result};
use crate::openai::{create_client, OpenAIClient};
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Separator placed between the transcripts of consecutive parts.
const PART_SEPARATOR: &str = "\n\n";

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: OpenAIClient,
    model: String,
    max_upload_bytes: u64,
    max_concurrent_parts: usize,
    work_dir: PathBuf,
}

impl WhisperTranscriber {
    /// Create a new Whisper transcriber.
    ///
    /// Oversized files are split into `work_dir` before upload.
    pub fn new(
        model: &str,
        max_upload_bytes: u64,
        max_concurrent_parts: usize,
        work_dir: PathBuf,
    ) -> Self {
        Self::with_client(create_client(), model, max_upload_bytes, max_concurrent_parts, work_dir)
    }

    /// Create a transcriber on top of an existing client.
    pub fn with_client(
        client: OpenAIClient,
        model: &str,
        max_upload_bytes: u64,
        max_concurrent_parts: usize,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            client,
            model: model.to_string(),
            max_upload_bytes,
            max_concurrent_parts: max_concurrent_parts.max(1),
            work_dir,
        }
    }

    /// Send one upload-sized clip to the API.
    #[instrument(skip(self, bytes), fields(file_name = %file_name, len = bytes.len()))]
    async fn transcribe_clip(&self, file_name: String, bytes: Vec<u8>) -> Result<String> {
        debug!("Uploading clip for transcription");

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(file_name, bytes))
            .model(&self.model)
            .response_format(AudioResponseFormat::Json)
            .build()
            .map_err(|e| EvrikaError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| EvrikaError::OpenAI(format!("Whisper API error: {}", e)))?;

        Ok(response.text.trim().to_string())
    }

    async fn transcribe_path(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();
        self.transcribe_clip(name, bytes).await
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_file(&self, audio_path: &Path) -> Result<String> {
        std::fs::create_dir_all(&self.work_dir)?;
        // Split parts live here and are removed when the guard drops, on error too
        let parts_dir = tempfile::Builder::new()
            .prefix("whisper-parts")
            .tempdir_in(&self.work_dir)?;
        let parts = split_audio_by_size(audio_path, parts_dir.path(), self.max_upload_bytes).await?;

        if parts.len() == 1 {
            return self.transcribe_path(&parts[0]).await;
        }

        let part_count = parts.len();
        info!("Transcribing {} audio parts with {}", part_count, self.model);

        let pb = ProgressBar::new(part_count as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("  {spinner:.green} Whisper   [{bar:30.cyan/blue}] {pos}/{len}")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }

        // `buffered` keeps part order while running several uploads at once
        let mut stream = stream::iter(parts.into_iter().enumerate())
            .map(|(idx, path)| async move { (idx, self.transcribe_path(&path).await) })
            .buffered(self.max_concurrent_parts);

        let mut texts = Vec::with_capacity(part_count);
        while let Some((idx, result)) = stream.next().await {
            pb.inc(1);
            match result {
                Ok(text) => texts.push(text),
                Err(e) => {
                    pb.finish_and_clear();
                    return Err(EvrikaError::Transcription(format!("Part {} failed: {}", idx, e)));
                }
            }
        }
        pb.finish_and_clear();

        Ok(texts.join(PART_SEPARATOR))
    }

    async fn transcribe_bytes(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        if bytes.is_empty() {
            return Err(EvrikaError::InvalidInput("Empty audio".to_string()));
        }
        self.transcribe_clip(file_name.to_string(), bytes).await
    }
}

/// Check if the OpenAI API key is configured.
pub fn is_api_key_configured() -> bool {
    std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.trim().is_empty())
}
