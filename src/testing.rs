//! Deterministic stand-ins for the hosted services, shared by unit tests.

use crate::agent::{AgentMessage, ModelTurn, ToolCallingModel};
use crate::app::{Backends, Services};
use crate::config::{Prompts, Settings};
use crate::embedding::Embedder;
use crate::error::{EvrikaError, Result};
use crate::llm::ChatModel;
use crate::transcription::Transcriber;
use crate::vector_store::MemoryVectorStore;
use crate::voice::SpeechSynthesizer;
use crate::youtube::{VideoMetadata, VideoSource};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Letter-frequency embedding: texts sharing letters point the same way.
pub struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; 26];
        for c in text.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
            v[(c as u8 - b'a') as usize] += 1.0;
        }
        Ok(v)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        26
    }
}

/// Chat model that records prompts and answers with a fixed reply.
pub struct FakeChat {
    reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeChat {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for FakeChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Video source serving one canned video.
pub struct FakeSource {
    pub metadata: VideoMetadata,
    pub captions: Option<String>,
    pub audio_downloads: AtomicUsize,
    audio_path: Option<PathBuf>,
}

impl FakeSource {
    pub fn new(id: &str, title: &str, captions: Option<&str>) -> Self {
        let raw = serde_json::json!({
            "id": id,
            "title": title,
            "webpage_url": format!("https://www.youtube.com/watch?v={id}"),
            "channel": "Test Channel",
            "duration": 600.0,
            "upload_date": "20240115",
        });
        Self {
            metadata: VideoMetadata::from_ytdlp_json(raw, id),
            captions: captions.map(str::to_string),
            audio_downloads: AtomicUsize::new(0),
            audio_path: None,
        }
    }

    /// Serve this file as the downloaded audio.
    pub fn with_audio_path(mut self, path: PathBuf) -> Self {
        self.audio_path = Some(path);
        self
    }
}

#[async_trait]
impl VideoSource for FakeSource {
    async fn fetch_metadata(&self, _url: &str) -> Result<VideoMetadata> {
        Ok(self.metadata.clone())
    }

    async fn fetch_captions(&self, _youtube_id: &str) -> Result<Option<String>> {
        Ok(self.captions.clone())
    }

    async fn download_audio(&self, _url: &str, youtube_id: &str) -> Result<PathBuf> {
        self.audio_downloads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .audio_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("/nonexistent/{youtube_id}.mp3"))))
    }
}

/// Transcriber returning fixed text, or failing when none is set.
pub struct FakeTranscriber(pub Option<String>);

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe_file(&self, _audio_path: &Path) -> Result<String> {
        self.0
            .clone()
            .ok_or_else(|| EvrikaError::Transcription("no audio".to_string()))
    }

    async fn transcribe_bytes(&self, _file_name: &str, _bytes: Vec<u8>) -> Result<String> {
        self.transcribe_file(Path::new("clip")).await
    }
}

/// Speech synthesizer returning fixed bytes, or failing when asked to.
pub struct FakeSpeech {
    pub fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn speak(&self, _text: &str) -> Result<Vec<u8>> {
        if self.fail {
            return Err(EvrikaError::OpenAI("speech unavailable".to_string()));
        }
        Ok(b"ID3fake".to_vec())
    }
}

/// Agent model that always answers in plain text.
pub struct FakeToolModel(pub String);

#[async_trait]
impl ToolCallingModel for FakeToolModel {
    async fn next_turn(&self, _messages: &[AgentMessage]) -> Result<ModelTurn> {
        Ok(ModelTurn {
            content: Some(self.0.clone()),
            tool_calls: Vec::new(),
        })
    }
}

/// Services over an in-memory store and the fakes above.
///
/// The fake video source serves `dQw4w9WgXcQ` with captions.
pub fn fake_services(settings: Settings, chat_reply: &str) -> Services {
    Services::assemble(settings, Prompts::default(), fake_backends(chat_reply))
}

/// The backends behind [`fake_services`], for tests that swap one out.
pub fn fake_backends(chat_reply: &str) -> Backends {
    Backends {
        store: Arc::new(MemoryVectorStore::new()),
        embedder: Arc::new(FakeEmbedder),
        llm: Arc::new(FakeChat::new(chat_reply)),
        source: Arc::new(FakeSource::new(
            "dQw4w9WgXcQ",
            "Never Gonna",
            Some("never gonna give you up never gonna let you down"),
        )),
        transcriber: Arc::new(FakeTranscriber(None)),
        voice_transcriber: Arc::new(FakeTranscriber(Some("what is this about?".to_string()))),
        speech: Arc::new(FakeSpeech { fail: false }),
        agent_model: Arc::new(FakeToolModel("agent reply".to_string())),
    }
}
