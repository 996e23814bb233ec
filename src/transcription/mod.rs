//! Speech-to-text for video audio and recorded questions.
//!
//! Long recordings are split into size-bounded parts, transcribed
//! concurrently and joined back in order.

mod whisper;

pub use whisper::{is_api_key_configured, WhisperTranscriber};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file of any length into plain text.
    async fn transcribe_file(&self, audio_path: &Path) -> Result<String>;

    /// Transcribe an in-memory clip. `file_name` carries the format hint.
    async fn transcribe_bytes(&self, file_name: &str, bytes: Vec<u8>) -> Result<String>;
}
