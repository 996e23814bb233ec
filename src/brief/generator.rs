//! Brief generation from a video's full transcript.

use crate::config::Prompts;
use crate::error::Result;
use crate::llm::ChatModel;
use crate::orchestrator::Orchestrator;
use crate::rag::MetadataView;
use crate::vector_store::VectorStore;
use crate::youtube::{extract_youtube_id, short_url};
use std::sync::Arc;
use tracing::{info, instrument};

pub const BRIEF_UNAVAILABLE: &str = "I could not find or ingest this video to generate a brief.";

/// Facts stamped onto a generated brief regardless of what the model wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct BriefHeader {
    pub title: String,
    pub url: String,
    pub channel: Option<String>,
    pub speaker: Option<String>,
}

impl BriefHeader {
    pub fn from_view(youtube_id: &str, view: &MetadataView) -> Self {
        Self {
            title: view
                .title
                .clone()
                .unwrap_or_else(|| "(title unknown)".to_string()),
            url: view.url.clone().unwrap_or_else(|| short_url(youtube_id)),
            channel: view.channel.clone(),
            speaker: view.speaker.clone(),
        }
    }
}

/// Rewrite the header, first `Generated:` line and source lines of a brief.
///
/// When the model dropped the `Generated:` line it is inserted under the header.
pub fn finalize_brief(brief: &str, header: &BriefHeader, generated_at: &str) -> String {
    let header_line = match &header.speaker {
        Some(speaker) => format!("# Evrika Brief - {} ({})", header.title, speaker),
        None => format!("# Evrika Brief - {}", header.title),
    };
    let generated_line = format!("Generated: {}", generated_at);
    let source_line = format!(
        "- Original video (title + URL): {} – {}",
        header.title, header.url
    );
    let creator_line = format!(
        "- Creator / Channel: {}",
        header.channel.as_deref().unwrap_or("Unknown")
    );

    let mut lines: Vec<String> = brief.lines().map(str::to_string).collect();
    let mut header_index = None;
    let mut generated_found = false;

    for (i, line) in lines.iter_mut().enumerate() {
        let stripped = line.trim();
        if stripped.starts_with("# Evrika Brief -") {
            header_index = Some(i);
            *line = header_line.clone();
        } else if stripped.starts_with("Generated:") && !generated_found {
            *line = generated_line.clone();
            generated_found = true;
        } else if stripped.starts_with("- Original video (title + URL):") {
            *line = source_line.clone();
        } else if stripped.starts_with("- Creator / Channel:") {
            *line = creator_line.clone();
        }
    }

    if let (false, Some(i)) = (generated_found, header_index) {
        lines.insert(i + 1, generated_line);
    }

    lines.join("\n")
}

/// Produces one-page Markdown briefs.
pub struct BriefGenerator {
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn ChatModel>,
    orchestrator: Arc<Orchestrator>,
    prompts: Prompts,
}

impl BriefGenerator {
    pub fn new(
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn ChatModel>,
        orchestrator: Arc<Orchestrator>,
        prompts: Prompts,
    ) -> Self {
        Self {
            store,
            llm,
            orchestrator,
            prompts,
        }
    }

    /// Generate a brief for a video URL or id, ingesting it first if needed.
    #[instrument(skip(self))]
    pub async fn generate_brief_text(&self, video_hint: &str) -> Result<String> {
        let youtube_id = extract_youtube_id(video_hint.trim())?;

        let mut chunks = self.store.chunks_for_video(&youtube_id).await?;
        if chunks.is_empty() {
            info!("No stored chunks, ingesting first");
            self.orchestrator.ingest_youtube(video_hint.trim(), false).await?;
            chunks = self.store.chunks_for_video(&youtube_id).await?;
            if chunks.is_empty() {
                return Ok(BRIEF_UNAVAILABLE.to_string());
            }
        }

        let meta = self
            .store
            .metadata_for_video(&youtube_id)
            .await?
            .unwrap_or_default();
        let header = BriefHeader::from_view(&youtube_id, &MetadataView::build(&youtube_id, &meta));

        let transcript = chunks.join("\n\n");
        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.brief.template, &[("transcript", &transcript)]);

        let draft = self.llm.complete(&prompt).await?;
        let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M").to_string();

        Ok(finalize_brief(&draft, &header, &generated_at))
    }
}
