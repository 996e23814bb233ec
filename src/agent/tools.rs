//! Tool definitions and implementations for the agent.

use crate::brief::{pdf_file_name, save_brief_pdf, BriefGenerator};
use crate::error::{EvrikaError, Result};
use crate::orchestrator::Orchestrator;
use crate::rag::RagEngine;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Suffix appended to tool outputs cut at the size limit.
const TRUNCATION_MARKER: &str = "... [truncated]";

/// JSON keys that carry the full yt-dlp dump.
const BULKY_KEYS: [&str; 2] = ["raw_meta", "raw_metadata"];

/// Tools the agent can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    /// Ingest a YouTube video.
    FetchVideo { url: String },

    /// Top matching transcript chunks.
    SemanticSearch { question: String, video_hint: String },

    /// Answer a content question about a video.
    VideoChat { question: String, video_hint: String },

    /// One-page brief for a video.
    GenerateBrief { video_hint: String },

    /// Follow-up learning steps.
    Recommendations { video_hint: String, learning_goal: String },

    /// Write a brief to a PDF file.
    SaveBriefAsPdf { brief_text: String, filename: Option<String> },

    /// Compact metadata JSON for a video.
    VideoMetadata { video_hint: String },
}

/// Services the tools dispatch to.
pub struct ToolContext {
    pub orchestrator: Arc<Orchestrator>,
    pub rag: Arc<RagEngine>,
    pub briefs: Arc<BriefGenerator>,
    pub output_dir: PathBuf,
    pub default_pdf_name: String,
}

impl ToolContext {
    /// Execute a tool call and return its output text.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        match tool {
            ToolCall::FetchVideo { url } => {
                let result = self.orchestrator.ingest_youtube(url, false).await?;
                let title = if result.title.is_empty() {
                    "(title unknown)"
                } else {
                    result.title.as_str()
                };
                Ok(format!(
                    "Ingested video '{}' (id={}) into Evrika Briefs with {} chunks.",
                    title, result.youtube_id, result.chunk_count
                ))
            }
            ToolCall::SemanticSearch {
                question,
                video_hint,
            } => self.rag.semantic_search(question, video_hint).await,
            ToolCall::VideoChat {
                question,
                video_hint,
            } => self.rag.answer_question(question, video_hint).await,
            ToolCall::GenerateBrief { video_hint } => {
                self.briefs.generate_brief_text(video_hint).await
            }
            ToolCall::Recommendations {
                video_hint,
                learning_goal,
            } => self.rag.recommendations(video_hint, learning_goal).await,
            ToolCall::SaveBriefAsPdf {
                brief_text,
                filename,
            } => {
                let name = filename
                    .as_deref()
                    .and_then(pdf_file_name)
                    .unwrap_or_else(|| self.default_pdf_name.clone());
                let path = save_brief_pdf(brief_text, &self.output_dir, &name)?;
                Ok(path.display().to_string())
            }
            ToolCall::VideoMetadata { video_hint } => self.rag.video_metadata(video_hint).await,
        }
    }
}

/// Keep a tool output within `max_chars` characters.
///
/// Oversized JSON objects first lose their raw metadata dumps; anything still
/// too long is cut and marked.
pub fn sanitize_tool_output(output: String, max_chars: usize) -> String {
    if output.chars().count() <= max_chars {
        return output;
    }

    let mut output = output;
    if let Ok(serde_json::Value::Object(mut map)) = serde_json::from_str(&output) {
        for key in BULKY_KEYS {
            if map.contains_key(key) {
                map.insert(
                    key.to_string(),
                    serde_json::Value::String(format!("[omitted: {} too large]", key)),
                );
            }
        }
        if let Ok(compact) = serde_json::to_string(&map) {
            output = compact;
        }
    }

    if output.chars().count() > max_chars {
        let mut cut: String = output.chars().take(max_chars).collect();
        cut.push_str(TRUNCATION_MARKER);
        return cut;
    }
    output
}

fn function_tool(
    name: &str,
    description: &str,
    parameters: serde_json::Value,
) -> async_openai::types::ChatCompletionTool {
    use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};

    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: name.to_string(),
            description: Some(description.to_string()),
            parameters: Some(parameters),
            strict: None,
        },
    }
}

/// OpenAI function definitions for every tool.
pub fn tool_definitions() -> Vec<async_openai::types::ChatCompletionTool> {
    let hint = serde_json::json!({
        "type": "string",
        "description": "YouTube URL or video ID. Empty means the current video."
    });

    vec![
        function_tool(
            "fetch_video",
            "Ingest a YouTube video into Evrika Briefs.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "YouTube URL or video ID"}
                },
                "required": ["url"]
            }),
        ),
        function_tool(
            "semantic_search",
            "Search the ingested video semantically and return the top matching chunks.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "question": {"type": "string", "description": "What to search for"},
                    "video_hint": hint
                },
                "required": ["question"]
            }),
        ),
        function_tool(
            "video_chat",
            "Answer a question about an ingested YouTube video using its transcript.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "question": {"type": "string", "description": "The user's question"},
                    "video_hint": hint
                },
                "required": ["question"]
            }),
        ),
        function_tool(
            "generate_brief",
            "Create a 1-page Evrika Brief in Markdown for a video.",
            serde_json::json!({
                "type": "object",
                "properties": {"video_hint": hint},
                "required": ["video_hint"]
            }),
        ),
        function_tool(
            "recommendations",
            "Suggest follow-up learning directions or search ideas based on a video.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "video_hint": hint,
                    "learning_goal": {"type": "string", "description": "Optional learning goal"}
                },
                "required": ["video_hint"]
            }),
        ),
        function_tool(
            "save_brief_as_pdf",
            "Save a Markdown brief as a styled PDF file and return its path.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "brief_text": {"type": "string", "description": "The brief in Markdown"},
                    "filename": {"type": "string", "description": "Output file name"}
                },
                "required": ["brief_text"]
            }),
        ),
        function_tool(
            "video_metadata",
            "Get metadata for a YouTube video (title, speaker, channel, duration, \
             publish date, URL) as a small JSON object.",
            serde_json::json!({
                "type": "object",
                "properties": {"video_hint": hint}
            }),
        ),
    ]
}

fn required_str(args: &serde_json::Value, key: &str) -> Result<String> {
    args[key]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| EvrikaError::Agent(format!("Missing '{}' argument", key)))
}

fn optional_str(args: &serde_json::Value, key: &str) -> String {
    args[key].as_str().unwrap_or_default().to_string()
}

/// Parse a tool call from the OpenAI response format.
///
/// Returns `Ok(None)` for a tool name the agent does not know.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<Option<ToolCall>> {
    let args: serde_json::Value = if arguments.trim().is_empty() {
        serde_json::Value::Object(Default::default())
    } else {
        serde_json::from_str(arguments)
            .map_err(|e| EvrikaError::Agent(format!("Invalid tool arguments: {}", e)))?
    };

    let tool = match name {
        "fetch_video" => ToolCall::FetchVideo {
            url: required_str(&args, "url")?,
        },
        "semantic_search" => ToolCall::SemanticSearch {
            question: required_str(&args, "question")?,
            video_hint: optional_str(&args, "video_hint"),
        },
        "video_chat" => ToolCall::VideoChat {
            question: required_str(&args, "question")?,
            video_hint: optional_str(&args, "video_hint"),
        },
        "generate_brief" => ToolCall::GenerateBrief {
            video_hint: required_str(&args, "video_hint")?,
        },
        "recommendations" => ToolCall::Recommendations {
            video_hint: optional_str(&args, "video_hint"),
            learning_goal: optional_str(&args, "learning_goal"),
        },
        "save_brief_as_pdf" => ToolCall::SaveBriefAsPdf {
            brief_text: required_str(&args, "brief_text")?,
            filename: args["filename"].as_str().map(str::to_string),
        },
        "video_metadata" => ToolCall::VideoMetadata {
            video_hint: optional_str(&args, "video_hint"),
        },
        _ => return Ok(None),
    };
    Ok(Some(tool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Prompts, Settings};
    use crate::session::Session;
    use crate::testing::{FakeChat, FakeEmbedder, FakeSource, FakeTranscriber};
    use crate::vector_store::MemoryVectorStore;

    fn context(output_dir: PathBuf) -> ToolContext {
        let settings = Settings::default();
        let store = Arc::new(MemoryVectorStore::new());
        let session = Arc::new(Session::new(12));
        let chat = Arc::new(FakeChat::new("answer"));
        let orchestrator = Arc::new(Orchestrator::new(
            &settings,
            Arc::new(FakeSource::new("abcdefghijk", "A Talk", Some("hello"))),
            Arc::new(FakeTranscriber(None)),
            Arc::new(FakeEmbedder),
            store.clone(),
            session.clone(),
        ));
        let rag = Arc::new(RagEngine::new(
            store.clone(),
            Arc::new(FakeEmbedder),
            chat.clone(),
            Prompts::default(),
            session,
            &settings.rag,
        ));
        let briefs = Arc::new(BriefGenerator::new(
            store,
            chat,
            orchestrator.clone(),
            Prompts::default(),
        ));
        ToolContext {
            orchestrator,
            rag,
            briefs,
            output_dir,
            default_pdf_name: "evrika_brief.pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_pdf_keeps_file_in_output_dir() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("briefs");
        let ctx = context(out.clone());

        let path = ctx
            .execute(&ToolCall::SaveBriefAsPdf {
                brief_text: "# Brief".to_string(),
                filename: Some("../../escape.pdf".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(PathBuf::from(path), out.join("escape.pdf"));
        assert!(!root.path().join("escape.pdf").exists());

        let path = ctx
            .execute(&ToolCall::SaveBriefAsPdf {
                brief_text: "# Brief".to_string(),
                filename: Some("..".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(PathBuf::from(path), out.join("evrika_brief.pdf"));
    }

    #[test]
    fn test_parse_video_chat() {
        let tool = parse_tool_call("video_chat", r#"{"question": "why?", "video_hint": "abc"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            tool,
            ToolCall::VideoChat {
                question: "why?".to_string(),
                video_hint: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_parse_optional_arguments() {
        let tool = parse_tool_call("video_metadata", "").unwrap().unwrap();
        assert_eq!(
            tool,
            ToolCall::VideoMetadata {
                video_hint: String::new()
            }
        );

        let tool = parse_tool_call("save_brief_as_pdf", r##"{"brief_text": "# B"}"##)
            .unwrap()
            .unwrap();
        assert_eq!(
            tool,
            ToolCall::SaveBriefAsPdf {
                brief_text: "# B".to_string(),
                filename: None
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_tool_call("fetch_video", "{}").is_err());
        assert!(parse_tool_call("fetch_video", "not json").is_err());
        assert!(parse_tool_call("get_transcript", "{}").unwrap().is_none());
    }

    #[test]
    fn test_definitions_cover_every_tool() {
        let names: Vec<String> = tool_definitions()
            .into_iter()
            .map(|t| t.function.name)
            .collect();
        assert_eq!(
            names,
            [
                "fetch_video",
                "semantic_search",
                "video_chat",
                "generate_brief",
                "recommendations",
                "save_brief_as_pdf",
                "video_metadata"
            ]
        );
    }

    #[test]
    fn test_sanitize_short_output_untouched() {
        assert_eq!(sanitize_tool_output("hello".to_string(), 10), "hello");
    }

    #[test]
    fn test_sanitize_drops_raw_metadata() {
        let json = serde_json::json!({
            "title": "T",
            "raw_meta": "x".repeat(500),
        })
        .to_string();

        let out = sanitize_tool_output(json, 100);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["title"], "T");
        assert_eq!(parsed["raw_meta"], "[omitted: raw_meta too large]");
    }

    #[test]
    fn test_sanitize_truncates_plain_text() {
        let out = sanitize_tool_output("é".repeat(50), 20);
        assert!(out.ends_with(TRUNCATION_MARKER));
        assert_eq!(out.chars().count(), 20 + TRUNCATION_MARKER.len());
    }
}
