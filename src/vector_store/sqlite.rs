//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust. The metadata object
//! is kept as JSON text; the video id gets its own indexed column.

use super::{
    cosine_similarity, summarize_videos, ChunkMetadata, Document, IndexedVideo, MatchedDocument,
    VectorStore,
};
use crate::error::{EvrikaError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        youtube_id TEXT NOT NULL,
        content TEXT NOT NULL,
        metadata TEXT NOT NULL,
        embedding BLOB NOT NULL,
        chunk_order INTEGER NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_documents_youtube_id ON documents(youtube_id);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| EvrikaError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_metadata(text: &str) -> ChunkMetadata {
        serde_json::from_str(text).unwrap_or_default()
    }

    fn parse_time(text: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    #[instrument(skip(self, docs), fields(count = docs.len()))]
    async fn insert_batch(&self, docs: &[Document]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for doc in docs {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO documents
                (id, youtube_id, content, metadata, embedding, chunk_order, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    doc.id.to_string(),
                    doc.metadata.youtube_id,
                    doc.content,
                    serde_json::to_string(&doc.metadata)?,
                    Self::embedding_to_bytes(&doc.embedding),
                    doc.chunk_order,
                    doc.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Inserted {} documents", docs.len());
        Ok(docs.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn match_documents(
        &self,
        query_embedding: &[f32],
        match_count: usize,
    ) -> Result<Vec<MatchedDocument>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, content, metadata, embedding FROM documents")?;

        let rows = stmt.query_map([], |row| {
            let metadata: String = row.get(2)?;
            let embedding: Vec<u8> = row.get(3)?;
            Ok(MatchedDocument {
                id: row.get(0)?,
                content: row.get(1)?,
                metadata: Self::parse_metadata(&metadata),
                similarity: cosine_similarity(query_embedding, &Self::bytes_to_embedding(&embedding)),
            })
        })?;

        let mut results: Vec<MatchedDocument> = rows.filter_map(|r| r.ok()).collect();
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(match_count);

        debug!("Found {} matching documents", results.len());
        Ok(results)
    }

    async fn chunk_count(&self, youtube_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE youtube_id = ?1",
            params![youtube_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    #[instrument(skip(self))]
    async fn chunks_for_video(&self, youtube_id: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT content FROM documents WHERE youtube_id = ?1 ORDER BY chunk_order",
        )?;

        let rows = stmt.query_map(params![youtube_id], |row| row.get::<_, String>(0))?;
        let chunks: Vec<String> = rows.filter_map(|r| r.ok()).collect();

        debug!("Loaded {} chunks for video {}", chunks.len(), youtube_id);
        Ok(chunks)
    }

    async fn metadata_for_video(&self, youtube_id: &str) -> Result<Option<ChunkMetadata>> {
        let conn = self.lock()?;
        let row = conn.query_row(
            "SELECT metadata FROM documents WHERE youtube_id = ?1 LIMIT 1",
            params![youtube_id],
            |row| row.get::<_, String>(0),
        );

        match row {
            Ok(text) => Ok(Some(Self::parse_metadata(&text))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn delete_video(&self, youtube_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM documents WHERE youtube_id = ?1",
            params![youtube_id],
        )?;

        info!("Deleted {} documents for video {}", deleted, youtube_id);
        Ok(deleted)
    }

    async fn list_videos(&self) -> Result<Vec<IndexedVideo>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT metadata, indexed_at FROM documents")?;

        let rows: Vec<(ChunkMetadata, Option<DateTime<Utc>>)> = stmt
            .query_map([], |row| {
                let metadata: String = row.get(0)?;
                let indexed_at: String = row.get(1)?;
                Ok((Self::parse_metadata(&metadata), Self::parse_time(&indexed_at)))
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(summarize_videos(rows.iter().map(|(m, t)| (m, *t))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(youtube_id: &str, content: &str, embedding: Vec<f32>, order: i32) -> Document {
        let metadata = ChunkMetadata {
            title: format!("Video {youtube_id}"),
            youtube_id: youtube_id.to_string(),
            source: crate::vector_store::SOURCE_TAG.to_string(),
            ..Default::default()
        };
        Document::new(content.to_string(), metadata, embedding, order)
    }

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory().unwrap();

        store
            .insert_batch(&[
                doc("vid1", "second", vec![0.0, 1.0, 0.0], 1),
                doc("vid1", "first", vec![1.0, 0.0, 0.0], 0),
                doc("vid2", "other", vec![0.5, 0.5, 0.0], 0),
            ])
            .await
            .unwrap();

        assert_eq!(store.chunk_count("vid1").await.unwrap(), 2);
        assert_eq!(store.chunk_count("missing").await.unwrap(), 0);
        assert_eq!(store.chunks_for_video("vid1").await.unwrap(), vec!["first", "second"]);

        let results = store.match_documents(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "first");
        assert!((results[0].similarity - 1.0).abs() < 0.001);
        assert_eq!(results[0].metadata.youtube_id, "vid1");

        let meta = store.metadata_for_video("vid2").await.unwrap().unwrap();
        assert_eq!(meta.title, "Video vid2");
        assert!(store.metadata_for_video("missing").await.unwrap().is_none());

        let videos = store.list_videos().await.unwrap();
        assert_eq!(videos.len(), 2);

        assert_eq!(store.delete_video("vid1").await.unwrap(), 2);
        assert_eq!(store.list_videos().await.unwrap().len(), 1);
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vectors.db");
        let rt = tokio::runtime::Runtime::new().unwrap();

        {
            let store = SqliteVectorStore::new(&path).unwrap();
            rt.block_on(store.insert_batch(&[doc("vid", "x", vec![1.0], 0)])).unwrap();
        }

        let store = SqliteVectorStore::new(&path).unwrap();
        assert_eq!(rt.block_on(store.chunk_count("vid")).unwrap(), 1);
    }
}
