//! Vector store abstraction for Evrika.
//!
//! Chunks are stored with their embedding and a JSON metadata object that
//! repeats the video-level details on every row.

mod memory;
mod sqlite;
mod supabase;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;
pub use supabase::SupabaseVectorStore;

use crate::config::{Settings, VectorStoreProvider};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Value of the `source` field on every chunk written by Evrika.
pub const SOURCE_TAG: &str = "evrika-briefs";

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Metadata stored alongside each chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub youtube_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    /// Full yt-dlp JSON for the video.
    #[serde(default)]
    pub raw_meta: serde_json::Value,
}

impl ChunkMetadata {
    /// Interpret a metadata column that may hold an object or a JSON string.
    ///
    /// Anything that cannot be read becomes empty metadata.
    pub fn from_value(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => serde_json::from_str(s).unwrap_or_default(),
            serde_json::Value::Object(_) => {
                serde_json::from_value(value.clone()).unwrap_or_default()
            }
            _ => Self::default(),
        }
    }
}

/// A chunk ready to be written to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
    /// Position of this chunk in the transcript.
    pub chunk_order: i32,
    pub indexed_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document with a fresh id.
    pub fn new(
        content: String,
        metadata: ChunkMetadata,
        embedding: Vec<f32>,
        chunk_order: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            metadata,
            embedding,
            chunk_order,
            indexed_at: Utc::now(),
        }
    }
}

/// A row returned by a similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct MatchedDocument {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Cosine similarity, higher is closer.
    pub similarity: f32,
}

/// Summary information about an indexed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedVideo {
    pub youtube_id: String,
    pub title: String,
    pub chunk_count: usize,
    /// Not every backend records when rows were written.
    pub indexed_at: Option<DateTime<Utc>>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Insert documents, returning how many were written.
    async fn insert_batch(&self, docs: &[Document]) -> Result<usize>;

    /// The `match_count` nearest chunks across all videos, best first.
    async fn match_documents(
        &self,
        query_embedding: &[f32],
        match_count: usize,
    ) -> Result<Vec<MatchedDocument>>;

    /// Number of chunks stored for a video.
    async fn chunk_count(&self, youtube_id: &str) -> Result<usize>;

    /// Every chunk text of a video in transcript order.
    async fn chunks_for_video(&self, youtube_id: &str) -> Result<Vec<String>>;

    /// Metadata of any one chunk of a video.
    async fn metadata_for_video(&self, youtube_id: &str) -> Result<Option<ChunkMetadata>>;

    /// Remove all chunks of a video, returning how many were deleted.
    async fn delete_video(&self, youtube_id: &str) -> Result<usize>;

    /// List all indexed videos.
    async fn list_videos(&self) -> Result<Vec<IndexedVideo>>;
}

/// Open the store selected in the settings.
pub fn open_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match settings.vector_store.provider {
        VectorStoreProvider::Sqlite => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
        VectorStoreProvider::Supabase => Arc::new(SupabaseVectorStore::from_settings(settings)?),
        VectorStoreProvider::Memory => Arc::new(MemoryVectorStore::new()),
    };
    Ok(store)
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Group rows into per-video summaries, most recently indexed first.
pub(crate) fn summarize_videos<'a, I>(rows: I) -> Vec<IndexedVideo>
where
    I: IntoIterator<Item = (&'a ChunkMetadata, Option<DateTime<Utc>>)>,
{
    let mut videos: HashMap<String, IndexedVideo> = HashMap::new();

    for (meta, indexed_at) in rows {
        if meta.youtube_id.is_empty() {
            continue;
        }
        let entry = videos
            .entry(meta.youtube_id.clone())
            .or_insert_with(|| IndexedVideo {
                youtube_id: meta.youtube_id.clone(),
                title: meta.title.clone(),
                chunk_count: 0,
                indexed_at,
            });
        entry.chunk_count += 1;
        if indexed_at > entry.indexed_at {
            entry.indexed_at = indexed_at;
        }
    }

    let mut list: Vec<IndexedVideo> = videos.into_values().collect();
    list.sort_by(|a, b| {
        b.indexed_at
            .cmp(&a.indexed_at)
            .then_with(|| a.youtube_id.cmp(&b.youtube_id))
    });
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);
    }

    #[test]
    fn test_metadata_from_object_and_string() {
        let obj = json!({"title": "T", "youtube_id": "abc", "channel": null});
        let meta = ChunkMetadata::from_value(&obj);
        assert_eq!(meta.title, "T");
        assert_eq!(meta.youtube_id, "abc");
        assert!(meta.channel.is_none());

        let as_string = json!(r#"{"title": null, "youtube_id": "xyz"}"#);
        let meta = ChunkMetadata::from_value(&as_string);
        assert_eq!(meta.title, "");
        assert_eq!(meta.youtube_id, "xyz");
    }

    #[test]
    fn test_unreadable_metadata_is_empty() {
        assert_eq!(ChunkMetadata::from_value(&json!("{not json")), ChunkMetadata::default());
        assert_eq!(ChunkMetadata::from_value(&json!(42)), ChunkMetadata::default());
    }

    #[test]
    fn test_summarize_videos() {
        let a = ChunkMetadata {
            youtube_id: "a".into(),
            title: "A".into(),
            ..Default::default()
        };
        let b = ChunkMetadata {
            youtube_id: "b".into(),
            title: "B".into(),
            ..Default::default()
        };
        let rows = vec![(&a, None), (&b, None), (&a, None)];
        let videos = summarize_videos(rows);
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].youtube_id, "a");
        assert_eq!(videos[0].chunk_count, 2);
    }
}
