//! In-memory vector store implementation.
//!
//! Useful for testing and throwaway sessions.

use super::{
    cosine_similarity, summarize_videos, ChunkMetadata, Document, IndexedVideo, MatchedDocument,
    VectorStore,
};
use crate::error::{EvrikaError, Result};
use async_trait::async_trait;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    documents: RwLock<Vec<Document>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Document>>> {
        self.documents
            .read()
            .map_err(|e| EvrikaError::VectorStore(format!("Lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Document>>> {
        self.documents
            .write()
            .map_err(|e| EvrikaError::VectorStore(format!("Lock poisoned: {}", e)))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert_batch(&self, docs: &[Document]) -> Result<usize> {
        self.write()?.extend_from_slice(docs);
        Ok(docs.len())
    }

    async fn match_documents(
        &self,
        query_embedding: &[f32],
        match_count: usize,
    ) -> Result<Vec<MatchedDocument>> {
        let docs = self.read()?;

        let mut results: Vec<MatchedDocument> = docs
            .iter()
            .map(|doc| MatchedDocument {
                id: doc.id.to_string(),
                content: doc.content.clone(),
                metadata: doc.metadata.clone(),
                similarity: cosine_similarity(query_embedding, &doc.embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(match_count);

        Ok(results)
    }

    async fn chunk_count(&self, youtube_id: &str) -> Result<usize> {
        Ok(self
            .read()?
            .iter()
            .filter(|d| d.metadata.youtube_id == youtube_id)
            .count())
    }

    async fn chunks_for_video(&self, youtube_id: &str) -> Result<Vec<String>> {
        let docs = self.read()?;
        let mut matching: Vec<&Document> = docs
            .iter()
            .filter(|d| d.metadata.youtube_id == youtube_id)
            .collect();
        matching.sort_by_key(|d| d.chunk_order);
        Ok(matching.into_iter().map(|d| d.content.clone()).collect())
    }

    async fn metadata_for_video(&self, youtube_id: &str) -> Result<Option<ChunkMetadata>> {
        Ok(self
            .read()?
            .iter()
            .find(|d| d.metadata.youtube_id == youtube_id)
            .map(|d| d.metadata.clone()))
    }

    async fn delete_video(&self, youtube_id: &str) -> Result<usize> {
        let mut docs = self.write()?;
        let initial_len = docs.len();
        docs.retain(|doc| doc.metadata.youtube_id != youtube_id);
        Ok(initial_len - docs.len())
    }

    async fn list_videos(&self) -> Result<Vec<IndexedVideo>> {
        let docs = self.read()?;
        Ok(summarize_videos(
            docs.iter().map(|d| (&d.metadata, Some(d.indexed_at))),
        ))
    }
}
