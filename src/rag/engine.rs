//! Question answering over stored transcript chunks.

use super::intent::{is_metadata_question, is_recommendation_question};
use super::MetadataView;
use crate::config::{Prompts, RagSettings};
use crate::embedding::Embedder;
use crate::error::{EvrikaError, Result};
use crate::llm::ChatModel;
use crate::session::Session;
use crate::vector_store::{MatchedDocument, VectorStore};
use crate::youtube::extract_youtube_id;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const NO_MATCHES: &str = "No matching chunks found in the knowledge base.";

const UNKNOWN_VIDEO: &str = "I don't know which video you mean. Please either ingest a video \
                             first or provide a specific YouTube URL or ID.";

const UNKNOWN_RECOMMENDATION_VIDEO: &str = "I don't know which video to base recommendations \
                                            on. Please provide a YouTube URL or ingest a video first.";

const NO_RECOMMENDATION_CHUNKS: &str = "I couldn't find any stored chunks for this video, so I \
                                        can't generate recommendations yet.";

/// How many rows to request when results will be filtered down to one video.
pub fn overfetch_count(match_count: usize, filtered: bool) -> usize {
    if filtered {
        (match_count * 3).max(match_count + 10)
    } else {
        match_count
    }
}

/// RAG engine for question answering.
pub struct RagEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn ChatModel>,
    prompts: Prompts,
    session: Arc<Session>,
    match_count: usize,
    recommendation_chunks: usize,
}

impl RagEngine {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn ChatModel>,
        prompts: Prompts,
        session: Arc<Session>,
        settings: &RagSettings,
    ) -> Self {
        Self {
            store,
            embedder,
            llm,
            prompts,
            session,
            match_count: settings.match_count,
            recommendation_chunks: settings.recommendation_chunks,
        }
    }

    /// Parse a video hint and make it the current video.
    ///
    /// An unparseable hint is logged and ignored.
    async fn video_from_hint(&self, video_hint: &str) -> Option<String> {
        if video_hint.trim().is_empty() {
            return None;
        }
        match extract_youtube_id(video_hint.trim()) {
            Ok(id) => {
                self.session.set_current_video(&id).await;
                Some(id)
            }
            Err(e) => {
                warn!("Failed to parse video hint '{}': {}", video_hint, e);
                None
            }
        }
    }

    /// The hinted video, otherwise the session's current video.
    pub async fn resolve_video(&self, video_hint: &str) -> Option<String> {
        if video_hint.trim().is_empty() {
            return self.session.current_video().await;
        }
        self.video_from_hint(video_hint).await
    }

    /// Nearest chunks to `query`, optionally restricted to one video.
    #[instrument(skip(self))]
    pub async fn retrieve(
        &self,
        query: &str,
        youtube_id: Option<&str>,
    ) -> Result<Vec<MatchedDocument>> {
        let embedding = self.embedder.embed(query).await?;
        let fetch = overfetch_count(self.match_count, youtube_id.is_some());

        let mut docs = self.store.match_documents(&embedding, fetch).await?;
        if let Some(id) = youtube_id {
            docs.retain(|d| d.metadata.youtube_id == id);
        }
        docs.truncate(self.match_count);

        debug!("Retrieved {} chunks after filtering", docs.len());
        Ok(docs)
    }

    /// Answer a question about a video, routing metadata and recommendation
    /// questions to their own prompts.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn answer_question(&self, question: &str, video_hint: &str) -> Result<String> {
        let youtube_id = self.resolve_video(video_hint).await;

        if is_metadata_question(question) {
            return self.answer_metadata_question(question, youtube_id.as_deref()).await;
        }

        if is_recommendation_question(question) {
            return self
                .answer_recommendation_question(question, youtube_id.as_deref())
                .await;
        }

        let mut contents: Vec<String> = self
            .retrieve(question, youtube_id.as_deref())
            .await?
            .into_iter()
            .map(|d| d.content)
            .collect();

        if contents.is_empty() {
            if let Some(id) = youtube_id.as_deref() {
                info!("Similarity search returned nothing; using all chunks of {}", id);
                contents = self.store.chunks_for_video(id).await?;
            }
        }

        if contents.is_empty() {
            return Ok(NO_MATCHES.to_string());
        }

        let context = contents
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[Chunk {}] {}", i + 1, c))
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = self.prompts.render_with_custom(
            &self.prompts.qa.answer,
            &[("context", &context), ("question", question)],
        );
        self.llm.complete(&prompt).await
    }

    /// Raw top chunks for a question, formatted for display or tool output.
    ///
    /// Only an explicit hint restricts the search.
    pub async fn semantic_search(&self, question: &str, video_hint: &str) -> Result<String> {
        let youtube_id = self.video_from_hint(video_hint).await;
        let docs = self.retrieve(question, youtube_id.as_deref()).await?;

        if docs.is_empty() {
            return Ok(NO_MATCHES.to_string());
        }

        Ok(docs
            .iter()
            .enumerate()
            .map(|(i, d)| format!("[Chunk {}]\n{}", i + 1, d.content))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n"))
    }

    /// Learning-coach suggestions for a video and an optional goal.
    #[instrument(skip(self))]
    pub async fn recommendations(&self, video_hint: &str, learning_goal: &str) -> Result<String> {
        let youtube_id = if video_hint.trim().is_empty() {
            self.session.current_video().await.ok_or_else(|| {
                EvrikaError::InvalidInput(UNKNOWN_RECOMMENDATION_VIDEO.to_string())
            })?
        } else {
            extract_youtube_id(video_hint.trim())?
        };

        let context = self.first_chunks(&youtube_id).await?;
        let goal = if learning_goal.trim().is_empty() {
            "(none given)"
        } else {
            learning_goal.trim()
        };

        let prompt = self.prompts.render_with_custom(
            &self.prompts.qa.learning_plan,
            &[("learning_goal", goal), ("context", &context)],
        );
        self.llm.complete(&prompt).await
    }

    /// Stored metadata of a video in its compact form.
    pub async fn metadata_view(&self, youtube_id: &str) -> Result<Option<MetadataView>> {
        Ok(self
            .store
            .metadata_for_video(youtube_id)
            .await?
            .map(|m| MetadataView::build(youtube_id, &m)))
    }

    /// Metadata of the hinted or current video as a small JSON document.
    ///
    /// Missing information is reported as a plain message instead of an error.
    pub async fn video_metadata(&self, video_hint: &str) -> Result<String> {
        let youtube_id = if video_hint.trim().is_empty() {
            self.session.current_video().await
        } else {
            match extract_youtube_id(video_hint.trim()) {
                Ok(id) => Some(id),
                Err(e) => {
                    return Ok(format!(
                        "Could not extract a YouTube ID from video_hint='{}': {}",
                        video_hint, e
                    ))
                }
            }
        };

        let Some(youtube_id) = youtube_id else {
            return Ok("I don't know which video you mean. Please either provide a YouTube \
                       URL/ID or ingest a video first using fetch_video."
                .to_string());
        };

        let Some(view) = self.metadata_view(&youtube_id).await? else {
            return Ok(format!("No metadata found for youtube_id={}.", youtube_id));
        };

        self.session.set_current_video(&youtube_id).await;
        Ok(serde_json::to_string(&view)?)
    }

    async fn answer_metadata_question(
        &self,
        question: &str,
        youtube_id: Option<&str>,
    ) -> Result<String> {
        let Some(youtube_id) = youtube_id else {
            return Ok(UNKNOWN_VIDEO.to_string());
        };

        let Some(view) = self.metadata_view(youtube_id).await? else {
            return Ok(format!(
                "I couldn't find stored metadata for this video (id={}).",
                youtube_id
            ));
        };

        let metadata_json = serde_json::to_string_pretty(&view)?;
        let prompt = self.prompts.render_with_custom(
            &self.prompts.qa.metadata,
            &[("metadata_json", &metadata_json), ("question", question)],
        );
        self.llm.complete(&prompt).await
    }

    async fn answer_recommendation_question(
        &self,
        question: &str,
        youtube_id: Option<&str>,
    ) -> Result<String> {
        let Some(youtube_id) = youtube_id else {
            return Ok(UNKNOWN_RECOMMENDATION_VIDEO.to_string());
        };

        let context = self.first_chunks(youtube_id).await?;
        if context.is_empty() {
            return Ok(NO_RECOMMENDATION_CHUNKS.to_string());
        }

        let prompt = self.prompts.render_with_custom(
            &self.prompts.qa.recommendation,
            &[
                ("youtube_id", youtube_id),
                ("question", question),
                ("context", &context),
            ],
        );
        self.llm.complete(&prompt).await
    }

    async fn first_chunks(&self, youtube_id: &str) -> Result<String> {
        let chunks = self.store.chunks_for_video(youtube_id).await?;
        Ok(chunks
            .into_iter()
            .take(self.recommendation_chunks)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeChat, FakeEmbedder};
    use crate::vector_store::{ChunkMetadata, Document, MemoryVectorStore};
    use serde_json::json;

    const VIDEO_A: &str = "aaaaaaaaaaa";
    const VIDEO_B: &str = "bbbbbbbbbbb";

    struct Fixture {
        engine: RagEngine,
        chat: Arc<FakeChat>,
        session: Arc<Session>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryVectorStore::new());
        let embedder = FakeEmbedder;

        let mut docs = Vec::new();
        for (id, title, texts) in [
            (VIDEO_A, "Rust Talk", vec!["ownership and borrowing", "lifetimes explained"]),
            (VIDEO_B, "Cooking Show", vec!["bake the bread slowly", "knead dough"]),
        ] {
            let meta = ChunkMetadata {
                title: title.into(),
                youtube_id: id.into(),
                channel: Some("Chan".into()),
                raw_meta: json!({"artist": "Host"}),
                ..Default::default()
            };
            for (i, t) in texts.into_iter().enumerate() {
                let emb = embedder.embed(t).await.unwrap();
                docs.push(Document::new(t.into(), meta.clone(), emb, i as i32));
            }
        }
        store.insert_batch(&docs).await.unwrap();

        let chat = Arc::new(FakeChat::new("model answer"));
        let session = Arc::new(Session::new(12));
        let engine = RagEngine::new(
            store,
            Arc::new(FakeEmbedder),
            chat.clone(),
            Prompts::default(),
            session.clone(),
            &RagSettings::default(),
        );
        Fixture {
            engine,
            chat,
            session,
        }
    }

    #[test]
    fn test_overfetch_count() {
        assert_eq!(overfetch_count(6, false), 6);
        assert_eq!(overfetch_count(6, true), 18);
        assert_eq!(overfetch_count(2, true), 12);
    }

    #[tokio::test]
    async fn test_retrieve_filters_to_video() {
        let f = fixture().await;
        let docs = f.engine.retrieve("bread", Some(VIDEO_A)).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.metadata.youtube_id == VIDEO_A));
    }

    #[tokio::test]
    async fn test_answer_uses_chunk_context() {
        let f = fixture().await;
        let answer = f.engine.answer_question("what about ownership?", VIDEO_A).await.unwrap();

        assert_eq!(answer, "model answer");
        let prompt = f.chat.last_prompt();
        assert!(prompt.contains("[Chunk 1] "));
        assert!(prompt.contains("what about ownership?"));
        assert!(!prompt.contains("bread"));
        assert_eq!(f.session.current_video().await.as_deref(), Some(VIDEO_A));
    }

    #[tokio::test]
    async fn test_metadata_question_uses_view() {
        let f = fixture().await;
        f.session.set_current_video(VIDEO_B).await;

        f.engine.answer_question("What is the title?", "").await.unwrap();
        let prompt = f.chat.last_prompt();
        assert!(prompt.contains("Cooking Show"));
        assert!(prompt.contains("\"speaker\": \"Host\""));
        assert!(!prompt.contains("raw_meta"));
    }

    #[tokio::test]
    async fn test_metadata_question_without_video() {
        let f = fixture().await;
        let answer = f.engine.answer_question("Who is the speaker?", "").await.unwrap();
        assert_eq!(answer, UNKNOWN_VIDEO);
        assert_eq!(f.chat.calls(), 0);
    }

    #[tokio::test]
    async fn test_metadata_question_unknown_video() {
        let f = fixture().await;
        let answer = f.engine.answer_question("video title?", "zzzzzzzzzzz").await.unwrap();
        assert!(answer.contains("id=zzzzzzzzzzz"));
    }

    #[tokio::test]
    async fn test_recommendation_routing() {
        let f = fixture().await;
        f.engine.answer_question("related videos please", VIDEO_A).await.unwrap();
        let prompt = f.chat.last_prompt();
        assert!(prompt.contains("learning coach"));
        assert!(prompt.contains(&format!("id={VIDEO_A}")));
        assert!(prompt.contains("ownership and borrowing"));
    }

    #[tokio::test]
    async fn test_no_video_no_matches() {
        let store = Arc::new(MemoryVectorStore::new());
        let engine = RagEngine::new(
            store,
            Arc::new(FakeEmbedder),
            Arc::new(FakeChat::new("unused")),
            Prompts::default(),
            Arc::new(Session::new(12)),
            &RagSettings::default(),
        );
        assert_eq!(engine.answer_question("anything?", "").await.unwrap(), NO_MATCHES);
        assert_eq!(engine.semantic_search("anything?", "").await.unwrap(), NO_MATCHES);
    }

    #[tokio::test]
    async fn test_empty_retrieval_falls_back_to_all_chunks() {
        let store = Arc::new(MemoryVectorStore::new());
        let mut docs = Vec::new();
        for (i, text) in vec!["bread bread"; 20].into_iter().enumerate() {
            let meta = ChunkMetadata {
                youtube_id: VIDEO_B.into(),
                ..Default::default()
            };
            docs.push(Document::new(text.into(), meta, FakeEmbedder.embed(text).await.unwrap(), i as i32));
        }
        for (i, text) in ["xyz", "zzyx"].into_iter().enumerate() {
            let meta = ChunkMetadata {
                youtube_id: VIDEO_A.into(),
                ..Default::default()
            };
            docs.push(Document::new(text.into(), meta, FakeEmbedder.embed(text).await.unwrap(), i as i32));
        }
        store.insert_batch(&docs).await.unwrap();

        let chat = Arc::new(FakeChat::new("model answer"));
        let engine = RagEngine::new(
            store,
            Arc::new(FakeEmbedder),
            chat.clone(),
            Prompts::default(),
            Arc::new(Session::new(12)),
            &RagSettings {
                match_count: 1,
                ..Default::default()
            },
        );

        assert!(engine.retrieve("bread?", Some(VIDEO_A)).await.unwrap().is_empty());

        let answer = engine.answer_question("bread?", VIDEO_A).await.unwrap();
        assert_eq!(answer, "model answer");
        let prompt = chat.last_prompt();
        assert!(prompt.contains("[Chunk 1] xyz"));
        assert!(prompt.contains("[Chunk 2] zzyx"));
        assert!(!prompt.contains("bread bread"));
    }

    #[tokio::test]
    async fn test_bad_hint_is_ignored() {
        let f = fixture().await;
        let answer = f.engine.answer_question("bread?", "not a url").await.unwrap();
        assert_eq!(answer, "model answer");
        assert!(f.session.current_video().await.is_none());
    }

    #[tokio::test]
    async fn test_semantic_search_format() {
        let f = fixture().await;
        let out = f.engine.semantic_search("bread", VIDEO_B).await.unwrap();
        assert!(out.starts_with("[Chunk 1]\n"));
        assert!(out.contains("\n\n---\n\n[Chunk 2]\n"));
    }

    #[tokio::test]
    async fn test_recommendations_with_goal() {
        let f = fixture().await;
        f.engine.recommendations(VIDEO_A, "").await.unwrap();
        assert!(f.chat.last_prompt().contains("Learning goal: (none given)"));

        f.engine.recommendations(VIDEO_A, "systems work").await.unwrap();
        assert!(f.chat.last_prompt().contains("Learning goal: systems work"));
    }

    #[tokio::test]
    async fn test_video_metadata_json() {
        let f = fixture().await;
        let out = f.engine.video_metadata(VIDEO_A).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["title"], "Rust Talk");
        assert_eq!(f.session.current_video().await.as_deref(), Some(VIDEO_A));

        let missing = f.engine.video_metadata("zzzzzzzzzzz").await.unwrap();
        assert!(missing.starts_with("No metadata found"));
    }
}
