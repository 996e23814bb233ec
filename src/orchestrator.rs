//! Ingestion pipeline for Evrika.
//!
//! Coordinates a video from URL to stored, embedded chunks.

use crate::chunking::chunk_words;
use crate::config::Settings;
use crate::embedding::Embedder;
use crate::error::{EvrikaError, Result};
use crate::session::Session;
use crate::transcription::Transcriber;
use crate::vector_store::{ChunkMetadata, Document, VectorStore, SOURCE_TAG};
use crate::youtube::{extract_youtube_id, VideoMetadata, VideoSource};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of an ingestion request.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub title: String,
    pub youtube_id: String,
    pub chunk_count: usize,
    /// The video was already stored and nothing new was written.
    #[serde(skip)]
    pub skipped: bool,
}

/// Drives a video through metadata, transcript, chunking, embedding and storage.
pub struct Orchestrator {
    source: Arc<dyn VideoSource>,
    transcriber: Arc<dyn Transcriber>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    session: Arc<Session>,
    chunk_size: usize,
    chunk_overlap: usize,
    prefer_captions: bool,
}

impl Orchestrator {
    /// Chunking and caption preferences come from `settings`.
    pub fn new(
        settings: &Settings,
        source: Arc<dyn VideoSource>,
        transcriber: Arc<dyn Transcriber>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        session: Arc<Session>,
    ) -> Self {
        Self {
            source,
            transcriber,
            embedder,
            store,
            session,
            chunk_size: settings.chunking.chunk_size_words,
            chunk_overlap: settings.chunking.overlap_words,
            prefer_captions: settings.transcription.prefer_captions,
        }
    }

    /// Ingest a video unless its chunks are already stored.
    ///
    /// With `force`, the video is processed again and its stored chunks are
    /// replaced once the new ones are embedded.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn ingest_youtube(&self, url: &str, force: bool) -> Result<IngestResult> {
        let mut youtube_id = extract_youtube_id(url)?;

        let existing = self.store.chunk_count(&youtube_id).await?;
        if existing > 0 && !force {
            info!("Skipping ingestion; found {} existing chunks", existing);
            let title = self
                .store
                .metadata_for_video(&youtube_id)
                .await?
                .map(|m| m.title)
                .unwrap_or_default();
            self.session.set_current_video(&youtube_id).await;
            return Ok(IngestResult {
                title,
                youtube_id,
                chunk_count: existing,
                skipped: true,
            });
        }

        info!("Fetching metadata");
        let metadata = self.source.fetch_metadata(url).await?;
        if !metadata.id.is_empty() {
            youtube_id = metadata.id.clone();
        }

        let transcript = self.transcript(url, &youtube_id).await?;
        let chunks = chunk_words(&transcript, self.chunk_size, self.chunk_overlap);
        info!("Split transcript into {} chunks", chunks.len());

        let page_url = metadata.webpage_url.clone().unwrap_or_else(|| url.to_string());
        let chunk_count = self
            .store_chunks(&youtube_id, &page_url, &metadata, chunks)
            .await?;

        self.session.set_current_video(&youtube_id).await;
        info!("Completed ingestion for {}", youtube_id);

        Ok(IngestResult {
            title: metadata.title,
            youtube_id,
            chunk_count,
            skipped: false,
        })
    }

    /// Published captions first, then speech-to-text on the audio track.
    async fn transcript(&self, url: &str, youtube_id: &str) -> Result<String> {
        if self.prefer_captions {
            match self.source.fetch_captions(youtube_id).await {
                Ok(Some(text)) => {
                    info!("Using published captions ({} chars)", text.len());
                    return Ok(text);
                }
                Ok(None) => info!("No captions, falling back to speech-to-text"),
                Err(e) => warn!("Caption lookup failed, falling back to speech-to-text: {}", e),
            }
        }

        let audio_path = self.source.download_audio(url, youtube_id).await?;
        let text = self.transcriber.transcribe_file(&audio_path).await;

        if audio_path.exists() {
            if let Err(e) = std::fs::remove_file(&audio_path) {
                warn!("Failed to clean up audio file: {}", e);
            }
        }
        text
    }

    async fn store_chunks(
        &self,
        youtube_id: &str,
        page_url: &str,
        metadata: &VideoMetadata,
        chunks: Vec<String>,
    ) -> Result<usize> {
        if chunks.is_empty() {
            warn!("No chunks to store");
            return Ok(0);
        }

        let base = ChunkMetadata {
            title: metadata.title.clone(),
            url: page_url.to_string(),
            youtube_id: youtube_id.to_string(),
            source: SOURCE_TAG.to_string(),
            duration_seconds: metadata.duration_seconds,
            channel: metadata.channel_or_uploader(),
            published_at: metadata.published_at(),
            raw_meta: metadata.raw.clone(),
        };

        info!("Embedding {} chunks", chunks.len());
        let embeddings = self.embedder.embed_batch(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(EvrikaError::Embedding(format!(
                "Got {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let documents: Vec<Document> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(order, (content, embedding))| {
                Document::new(content, base.clone(), embedding, order as i32)
            })
            .collect();

        let replaced = self.store.delete_video(youtube_id).await?;
        if replaced > 0 {
            info!("Replacing {} stored chunks", replaced);
        }
        self.store.insert_batch(&documents).await
    }
}
