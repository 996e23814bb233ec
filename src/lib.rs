//! Evrika Briefs - question answering and briefs for YouTube videos
//!
//! Evrika ingests a YouTube video's captions (or a Whisper transcript of its
//! audio), stores embedded chunks in a vector store and answers questions
//! about the video. It also writes one-page Markdown briefs and renders them
//! to PDF.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `youtube` - Video IDs, metadata and captions via yt-dlp
//! - `audio` - Audio download and conversion for Whisper
//! - `transcription` - Speech-to-text
//! - `chunking` - Word-window chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - SQLite, Supabase and in-memory stores
//! - `orchestrator` - The ingestion pipeline
//! - `rag` - Retrieval, answers, recommendations and metadata
//! - `brief` - Brief generation and PDF rendering
//! - `agent` - Tool-calling agent over the services above
//! - `voice` - Voice questions in, spoken answers out
//! - `app` - Service wiring shared by the CLI and the API
//! - `api` - HTTP API for the web front-end
//!
//! # Example
//!
//! ```rust,no_run
//! use evrika::app::Services;
//! use evrika::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let services = Services::from_settings(Settings::load()?)?;
//!
//!     let result = services
//!         .orchestrator
//!         .ingest_youtube("https://youtu.be/dQw4w9WgXcQ", false)
//!         .await?;
//!     println!("Stored {} chunks", result.chunk_count);
//!
//!     let answer = services.rag.answer_question("What is it about?", "").await?;
//!     println!("{}", answer);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod api;
pub mod app;
pub mod audio;
pub mod brief;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod session;
pub mod transcription;
pub mod vector_store;
pub mod voice;
pub mod youtube;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{EvrikaError, Result};
