//! Request handlers.

use super::prompt::{extract_video_url, parse_ingestion_url};
use super::ApiError;
use crate::app::Services;
use crate::brief::render_pdf;
use crate::orchestrator::IngestResult;
use axum::{
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
    Form, Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

type AppState = State<Arc<Services>>;

const INGESTED: &str = "Video ingested into Evrika Briefs.";

// === Request/Response Types ===

#[derive(Deserialize)]
pub struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    reply: String,
}

#[derive(Deserialize)]
pub struct IngestRequest {
    url: String,
    /// Re-process a video that is already stored.
    #[serde(default)]
    force: bool,
}

#[derive(Deserialize)]
pub struct BriefRequest {
    video_hint: String,
}

#[derive(Serialize)]
pub struct BriefResponse {
    brief_markdown: String,
}

#[derive(Deserialize)]
pub struct BriefForm {
    video_hint: String,
}

#[derive(Serialize)]
pub struct BriefFormResponse {
    video_hint: String,
    brief_markdown: String,
}

#[derive(Deserialize)]
pub struct BriefPdfRequest {
    brief_markdown: String,
}

#[derive(Deserialize)]
pub struct TextQueryForm {
    question: String,
    #[serde(default)]
    video_hint: String,
}

#[derive(Serialize)]
pub struct TextQueryResponse {
    question: String,
    answer: String,
}

#[derive(Serialize, Default)]
pub struct VoiceQueryResponse {
    question: Option<String>,
    answer: Option<String>,
    audio_base64: Option<String>,
    audio_mime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl VoiceQueryResponse {
    fn failed(error: String, question: Option<String>) -> Json<Self> {
        Json(Self {
            question,
            error: Some(error),
            ..Default::default()
        })
    }
}

// === Handlers ===

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn chat(
    State(state): AppState,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let reply = state.agent.respond(&req.message).await?;
    Ok(Json(ChatResponse { reply }))
}

pub async fn ingest(
    State(state): AppState,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResult>, ApiError> {
    let result = state.orchestrator.ingest_youtube(req.url.trim(), req.force).await?;
    Ok(Json(result))
}

pub async fn brief(
    State(state): AppState,
    Json(req): Json<BriefRequest>,
) -> Result<Json<BriefResponse>, ApiError> {
    info!("Brief requested for {:?}", req.video_hint);
    let brief_markdown = state.briefs.generate_brief_text(&req.video_hint).await?;
    Ok(Json(BriefResponse { brief_markdown }))
}

pub async fn generate_brief_form(
    State(state): AppState,
    Form(form): Form<BriefForm>,
) -> Result<Json<BriefFormResponse>, ApiError> {
    let brief_markdown = state.briefs.generate_brief_text(&form.video_hint).await?;
    Ok(Json(BriefFormResponse {
        video_hint: form.video_hint,
        brief_markdown,
    }))
}

pub async fn brief_pdf(
    State(state): AppState,
    Json(req): Json<BriefPdfRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = render_pdf(&req.brief_markdown)?;
    let disposition = format!("attachment; filename=\"{}\"", state.settings.brief.pdf_filename);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// One endpoint for both "Fetch this video" commands and ordinary questions.
///
/// Failures are reported inside `answer` so the chat UI can show them.
pub async fn text_query(
    State(state): AppState,
    Form(form): Form<TextQueryForm>,
) -> Json<TextQueryResponse> {
    let question = form.question;

    let answer = if let Some(url) = parse_ingestion_url(&question) {
        info!("Ingestion requested for {}", url);
        match state.orchestrator.ingest_youtube(&url, false).await {
            Ok(result) => {
                info!("Ingested {} ({} chunks)", result.youtube_id, result.chunk_count);
                INGESTED.to_string()
            }
            Err(e) => {
                warn!("Ingestion failed: {}", e);
                format!("Failed to ingest video '{}': {}", url, e)
            }
        }
    } else {
        let hint = if form.video_hint.trim().is_empty() {
            extract_video_url(&question).unwrap_or_default()
        } else {
            form.video_hint
        };
        match state.rag.answer_question(&question, &hint).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Answering failed: {}", e);
                format!("Error while answering your question: {}", e)
            }
        }
    };

    Json(TextQueryResponse { question, answer })
}

/// Transcribe a recorded question, answer it and speak the answer.
///
/// Speech synthesis is best effort: on failure the audio fields stay null.
pub async fn voice_query(State(state): AppState, mut multipart: Multipart) -> Json<VoiceQueryResponse> {
    let mut audio: Option<Vec<u8>> = None;
    let mut video_hint = String::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return VoiceQueryResponse::failed(format!("Error reading file: {}", e), None),
        };
        match field.name() {
            Some("file") => match field.bytes().await {
                Ok(bytes) => audio = Some(bytes.to_vec()),
                Err(e) => {
                    return VoiceQueryResponse::failed(format!("Error reading file: {}", e), None)
                }
            },
            Some("video_hint") => video_hint = field.text().await.unwrap_or_default(),
            _ => {}
        }
    }

    let Some(audio) = audio else {
        return VoiceQueryResponse::failed(
            "Error reading file: missing 'file' field".to_string(),
            None,
        );
    };

    let question = match state.voice.transcribe_question(&audio).await {
        Ok(q) => q,
        Err(e) => {
            warn!("Speech-to-text failed: {}", e);
            return VoiceQueryResponse::failed(format!("STT error: {}", e), None);
        }
    };
    info!("Transcribed voice question: {:?}", question);

    let answer = match state.rag.answer_question(&question, &video_hint).await {
        Ok(a) => a,
        Err(e) => {
            warn!("Answering failed: {}", e);
            return VoiceQueryResponse::failed(format!("QA error: {}", e), Some(question));
        }
    };

    let (audio_base64, audio_mime) = match state.voice.synthesize(&answer).await {
        Ok((bytes, mime)) => (Some(STANDARD.encode(bytes)), Some(mime)),
        Err(e) => {
            warn!("Speech synthesis failed: {}", e);
            (None, None)
        }
    };

    Json(VoiceQueryResponse {
        question: Some(question),
        answer: Some(answer),
        audio_base64,
        audio_mime,
        error: None,
    })
}
