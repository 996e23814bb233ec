//! Supabase (PostgREST + pgvector) vector store.
//!
//! Expects a `documents` table with `id`, `content`, `metadata jsonb` and
//! `embedding vector` columns, and a `match_documents(query_embedding,
//! match_count)` function returning rows with a `similarity` column.
//!
//! A chunk's transcript position is kept as `chunk_order` inside `metadata`,
//! so the table needs no extra column.

use super::{ChunkMetadata, Document, IndexedVideo, MatchedDocument, VectorStore};
use crate::config::Settings;
use crate::error::{EvrikaError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument};

const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    metadata: Value,
    #[serde(default)]
    similarity: Option<f32>,
    #[serde(default)]
    chunk_order: Option<i64>,
}

impl Row {
    fn id_string(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VideoRow {
    #[serde(default)]
    youtube_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Vector store backed by a Supabase project.
pub struct SupabaseVectorStore {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
    match_function: String,
}

impl SupabaseVectorStore {
    /// Create a store for the project at `base_url` using a service key.
    pub fn new(base_url: &str, api_key: &str, table: &str, match_function: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: table.to_string(),
            match_function: match_function.to_string(),
        })
    }

    /// Build from `[vector_store]` settings and `SUPABASE_SERVICE_KEY`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let url = settings.vector_store.supabase_url.as_deref().ok_or_else(|| {
            EvrikaError::Config(
                "Supabase URL missing: set SUPABASE_URL or vector_store.supabase_url".to_string(),
            )
        })?;
        let key = Settings::supabase_service_key()?;

        Self::new(
            url,
            &key,
            &settings.vector_store.table,
            &settings.vector_store.match_function,
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn contains_video(youtube_id: &str) -> String {
        format!("cs.{}", json!({ "youtube_id": youtube_id }))
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(EvrikaError::VectorStore(format!(
            "Supabase returned {}: {}",
            status,
            body.trim()
        )))
    }

    async fn select_rows(&self, select: &str, youtube_id: &str, extra: &[(&str, &str)]) -> Result<Vec<Row>> {
        let filter = Self::contains_video(youtube_id);
        let mut query: Vec<(&str, &str)> = vec![("select", select), ("metadata", &filter)];
        query.extend_from_slice(extra);

        let response = self
            .request(Method::GET, &self.table)
            .query(&query)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }
}

#[async_trait]
impl VectorStore for SupabaseVectorStore {
    fn name(&self) -> &'static str {
        "supabase"
    }

    #[instrument(skip(self, docs), fields(count = docs.len()))]
    async fn insert_batch(&self, docs: &[Document]) -> Result<usize> {
        if docs.is_empty() {
            return Ok(0);
        }

        let rows: Vec<Value> = docs
            .iter()
            .map(|doc| -> Result<Value> {
                let mut metadata = serde_json::to_value(&doc.metadata)?;
                if let Value::Object(map) = &mut metadata {
                    map.insert("chunk_order".to_string(), json!(doc.chunk_order));
                }
                Ok(json!({
                    "content": doc.content,
                    "metadata": metadata,
                    "embedding": doc.embedding,
                }))
            })
            .collect::<Result<_>>()?;

        let response = self
            .request(Method::POST, &self.table)
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await?;
        Self::check(response).await?;

        info!("Stored {} chunks in Supabase", rows.len());
        Ok(rows.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn match_documents(
        &self,
        query_embedding: &[f32],
        match_count: usize,
    ) -> Result<Vec<MatchedDocument>> {
        let response = self
            .request(Method::POST, &format!("rpc/{}", self.match_function))
            .json(&json!({
                "query_embedding": query_embedding,
                "match_count": match_count,
            }))
            .send()
            .await?;

        let rows: Vec<Row> = Self::check(response).await?.json().await?;
        debug!("match_documents returned {} rows", rows.len());

        Ok(rows
            .into_iter()
            .map(|row| MatchedDocument {
                id: row.id_string(),
                metadata: ChunkMetadata::from_value(&row.metadata),
                content: row.content.unwrap_or_default(),
                similarity: row.similarity.unwrap_or_default(),
            })
            .collect())
    }

    async fn chunk_count(&self, youtube_id: &str) -> Result<usize> {
        let rows = self.select_rows("id", youtube_id, &[]).await?;
        if !rows.is_empty() {
            info!("Found {} existing chunks for {}", rows.len(), youtube_id);
        }
        Ok(rows.len())
    }

    async fn chunks_for_video(&self, youtube_id: &str) -> Result<Vec<String>> {
        let mut rows = self
            .select_rows(
                "content,chunk_order:metadata->chunk_order",
                youtube_id,
                &[("order", "metadata->chunk_order.asc")],
            )
            .await?;
        // Rows written without an order sort last
        rows.sort_by_key(|r| r.chunk_order.unwrap_or(i64::MAX));
        debug!("Loaded {} chunks for {}", rows.len(), youtube_id);
        Ok(rows.into_iter().filter_map(|r| r.content).collect())
    }

    async fn metadata_for_video(&self, youtube_id: &str) -> Result<Option<ChunkMetadata>> {
        let rows = self
            .select_rows("metadata", youtube_id, &[("limit", "1")])
            .await?;
        Ok(rows.first().map(|r| ChunkMetadata::from_value(&r.metadata)))
    }

    #[instrument(skip(self))]
    async fn delete_video(&self, youtube_id: &str) -> Result<usize> {
        let filter = Self::contains_video(youtube_id);
        let response = self
            .request(Method::DELETE, &self.table)
            .header("Prefer", "return=representation")
            .query(&[("select", "id"), ("metadata", filter.as_str())])
            .send()
            .await?;

        let rows: Vec<Row> = Self::check(response).await?.json().await?;
        info!("Deleted {} chunks for {}", rows.len(), youtube_id);
        Ok(rows.len())
    }

    async fn list_videos(&self) -> Result<Vec<IndexedVideo>> {
        // Project just two keys so raw yt-dlp JSON is not transferred per row
        let response = self
            .request(Method::GET, &self.table)
            .query(&[(
                "select",
                "youtube_id:metadata->>youtube_id,title:metadata->>title",
            )])
            .send()
            .await?;

        let rows: Vec<VideoRow> = Self::check(response).await?.json().await?;
        let metas: Vec<ChunkMetadata> = rows
            .into_iter()
            .map(|r| ChunkMetadata {
                youtube_id: r.youtube_id.unwrap_or_default(),
                title: r.title.unwrap_or_default(),
                ..Default::default()
            })
            .collect();

        Ok(super::summarize_videos(metas.iter().map(|m| (m, None))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> SupabaseVectorStore {
        SupabaseVectorStore::new(&server.uri(), "service-key", "documents", "match_documents")
            .unwrap()
    }

    #[tokio::test]
    async fn test_match_documents_parses_rows() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/match_documents"))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .and(body_partial_json(json!({"match_count": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 7, "content": "alpha", "metadata": {"youtube_id": "abc", "title": "T"}, "similarity": 0.9},
                {"id": 8, "content": "beta", "metadata": "{\"youtube_id\": \"xyz\"}", "similarity": 0.5},
                {"id": 9, "content": "gamma", "metadata": "not json", "similarity": 0.1}
            ])))
            .mount(&server)
            .await;

        let docs = store(&server).match_documents(&[0.1, 0.2], 3).await.unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].id, "7");
        assert_eq!(docs[0].metadata.title, "T");
        assert_eq!(docs[1].metadata.youtube_id, "xyz");
        assert_eq!(docs[2].metadata, ChunkMetadata::default());
    }

    #[tokio::test]
    async fn test_chunk_count_uses_contains_filter() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/documents"))
            .and(query_param("select", "id"))
            .and(query_param("metadata", r#"cs.{"youtube_id":"abc"}"#))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
            .mount(&server)
            .await;

        assert_eq!(store(&server).chunk_count("abc").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_metadata_for_missing_video() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/documents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        assert!(store(&server).metadata_for_video("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_sends_rows() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/documents"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let meta = ChunkMetadata {
            youtube_id: "abc".into(),
            ..Default::default()
        };
        let docs = vec![Document::new("hello".into(), meta, vec![0.5], 0)];
        assert_eq!(store(&server).insert_batch(&docs).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_keeps_chunk_order_in_metadata() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/documents"))
            .and(body_partial_json(json!([
                {"content": "first", "metadata": {"youtube_id": "abc", "chunk_order": 0}},
                {"content": "second", "metadata": {"youtube_id": "abc", "chunk_order": 1}}
            ])))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let meta = ChunkMetadata {
            youtube_id: "abc".into(),
            ..Default::default()
        };
        let docs = vec![
            Document::new("first".into(), meta.clone(), vec![0.5], 0),
            Document::new("second".into(), meta, vec![0.5], 1),
        ];
        assert_eq!(store(&server).insert_batch(&docs).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_chunks_for_video_follow_chunk_order() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/documents"))
            .and(query_param("order", "metadata->chunk_order.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"content": "third", "chunk_order": 2},
                {"content": "legacy"},
                {"content": "first", "chunk_order": 0},
                {"content": "second", "chunk_order": 1}
            ])))
            .mount(&server)
            .await;

        let chunks = store(&server).chunks_for_video("abc").await.unwrap();
        assert_eq!(chunks, vec!["first", "second", "third", "legacy"]);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = store(&server).chunk_count("abc").await.unwrap_err();
        assert!(matches!(err, EvrikaError::VectorStore(ref m) if m.contains("bad key")));
    }

    #[tokio::test]
    async fn test_list_videos_groups_rows() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/documents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"youtube_id": "abc", "title": "A"},
                {"youtube_id": "abc", "title": "A"},
                {"youtube_id": null, "title": null}
            ])))
            .mount(&server)
            .await;

        let videos = store(&server).list_videos().await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].chunk_count, 2);
    }
}
