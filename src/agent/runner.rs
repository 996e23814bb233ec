//! Agent runner with tool calling loop.

use super::tools::{parse_tool_call, sanitize_tool_output, tool_definitions, ToolContext};
use crate::config::AgentSettings;
use crate::error::{EvrikaError, Result};
use crate::openai::{create_client, OpenAIClient};
use crate::session::{Role, Session};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments.
    pub arguments: String,
}

/// One message of an agent conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentMessage {
    System(String),
    User(String),
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolInvocation>,
    },
    Tool {
        call_id: String,
        content: String,
    },
}

/// What the model produced for one turn.
#[derive(Debug, Clone, Default)]
pub struct ModelTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolInvocation>,
}

/// A chat model that may answer with tool calls.
#[async_trait]
pub trait ToolCallingModel: Send + Sync {
    async fn next_turn(&self, messages: &[AgentMessage]) -> Result<ModelTurn>;
}

/// OpenAI chat completions with the agent's tool definitions attached.
pub struct OpenAIToolModel {
    client: OpenAIClient,
    model: String,
}

impl OpenAIToolModel {
    pub fn new(model: &str) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
        }
    }

    fn to_request_message(message: &AgentMessage) -> Result<ChatCompletionRequestMessage> {
        let agent_err = |e: async_openai::error::OpenAIError| EvrikaError::Agent(e.to_string());

        let built: ChatCompletionRequestMessage = match message {
            AgentMessage::System(text) => ChatCompletionRequestSystemMessageArgs::default()
                .content(text.as_str())
                .build()
                .map_err(agent_err)?
                .into(),
            AgentMessage::User(text) => ChatCompletionRequestUserMessageArgs::default()
                .content(text.as_str())
                .build()
                .map_err(agent_err)?
                .into(),
            AgentMessage::Assistant {
                content,
                tool_calls,
            } => {
                let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                if let Some(text) = content {
                    args.content(text.as_str());
                }
                if !tool_calls.is_empty() {
                    args.tool_calls(
                        tool_calls
                            .iter()
                            .map(|call| ChatCompletionMessageToolCall {
                                id: call.id.clone(),
                                r#type: ChatCompletionToolType::Function,
                                function: FunctionCall {
                                    name: call.name.clone(),
                                    arguments: call.arguments.clone(),
                                },
                            })
                            .collect::<Vec<_>>(),
                    );
                }
                args.build().map_err(agent_err)?.into()
            }
            AgentMessage::Tool { call_id, content } => {
                ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(call_id.as_str())
                    .content(content.as_str())
                    .build()
                    .map_err(agent_err)?
                    .into()
            }
        };
        Ok(built)
    }
}

#[async_trait]
impl ToolCallingModel for OpenAIToolModel {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn next_turn(&self, messages: &[AgentMessage]) -> Result<ModelTurn> {
        let request_messages = messages
            .iter()
            .map(Self::to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages)
            .tools(tool_definitions())
            .build()
            .map_err(|e| EvrikaError::Agent(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| EvrikaError::OpenAI(format!("Agent API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| EvrikaError::Agent("No response from model".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolInvocation {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        Ok(ModelTurn {
            content: choice.message.content,
            tool_calls,
        })
    }
}

/// Conversational agent over the video tools.
pub struct Agent {
    model: Arc<dyn ToolCallingModel>,
    tools: ToolContext,
    session: Arc<Session>,
    system_prompt: String,
    max_iterations: usize,
    max_tool_output_chars: usize,
}

impl Agent {
    pub fn new(
        model: Arc<dyn ToolCallingModel>,
        tools: ToolContext,
        session: Arc<Session>,
        system_prompt: &str,
        settings: &AgentSettings,
    ) -> Self {
        Self {
            model,
            tools,
            session,
            system_prompt: system_prompt.to_string(),
            max_iterations: settings.max_iterations.max(1),
            max_tool_output_chars: settings.max_tool_output_chars,
        }
    }

    /// Answer one user message, calling tools until the model replies in text.
    ///
    /// The exchange is appended to the session history on success.
    #[instrument(skip(self), fields(input_len = user_input.len()))]
    pub async fn respond(&self, user_input: &str) -> Result<String> {
        let mut messages = vec![AgentMessage::System(self.system_prompt.clone())];
        for turn in self.session.recent_history().await {
            messages.push(match turn.role {
                Role::User => AgentMessage::User(turn.content),
                Role::Assistant => AgentMessage::Assistant {
                    content: Some(turn.content),
                    tool_calls: Vec::new(),
                },
            });
        }
        messages.push(AgentMessage::User(user_input.to_string()));

        for iteration in 1..=self.max_iterations {
            debug!("Agent iteration {}", iteration);
            let turn = self.model.next_turn(&messages).await?;

            if turn.tool_calls.is_empty() {
                let reply = turn.content.unwrap_or_default();
                self.session.record_exchange(user_input, &reply).await;
                return Ok(reply);
            }

            messages.push(AgentMessage::Assistant {
                content: turn.content.clone(),
                tool_calls: turn.tool_calls.clone(),
            });

            for call in &turn.tool_calls {
                let output = self.run_tool(call).await;
                messages.push(AgentMessage::Tool {
                    call_id: call.id.clone(),
                    content: sanitize_tool_output(output, self.max_tool_output_chars),
                });
            }
        }

        Err(EvrikaError::Agent(format!(
            "Agent exceeded maximum iterations ({})",
            self.max_iterations
        )))
    }

    async fn run_tool(&self, call: &ToolInvocation) -> String {
        info!("Agent calling tool: {} with args: {}", call.name, call.arguments);

        match parse_tool_call(&call.name, &call.arguments) {
            Ok(Some(tool)) => match self.tools.execute(&tool).await {
                Ok(output) => output,
                Err(e) => format!("Tool error: {}", e),
            },
            Ok(None) => format!("Error: unknown tool '{}'.", call.name),
            Err(e) => format!("Failed to parse tool call: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief::BriefGenerator;
    use crate::config::{Prompts, RagSettings, Settings};
    use crate::orchestrator::Orchestrator;
    use crate::rag::RagEngine;
    use crate::testing::{FakeChat, FakeEmbedder, FakeSource, FakeTranscriber};
    use crate::vector_store::MemoryVectorStore;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    const VIDEO: &str = "dQw4w9WgXcQ";

    /// Replays canned turns and records every conversation it was shown.
    struct ScriptedModel {
        turns: Mutex<VecDeque<ModelTurn>>,
        seen: Mutex<Vec<Vec<AgentMessage>>>,
    }

    impl ScriptedModel {
        fn new(turns: Vec<ModelTurn>) -> Self {
            Self {
                turns: Mutex::new(turns.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<Vec<AgentMessage>> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolCallingModel for ScriptedModel {
        async fn next_turn(&self, messages: &[AgentMessage]) -> Result<ModelTurn> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(self.turns.lock().unwrap().pop_front().unwrap_or(ModelTurn {
                content: Some("done".to_string()),
                tool_calls: Vec::new(),
            }))
        }
    }

    fn reply(text: &str) -> ModelTurn {
        ModelTurn {
            content: Some(text.to_string()),
            tool_calls: Vec::new(),
        }
    }

    fn call(id: &str, name: &str, arguments: &str) -> ModelTurn {
        ModelTurn {
            content: None,
            tool_calls: vec![ToolInvocation {
                id: id.to_string(),
                name: name.to_string(),
                arguments: arguments.to_string(),
            }],
        }
    }

    fn agent(model: Arc<ScriptedModel>, settings: &Settings, output_dir: PathBuf) -> Agent {
        let store = Arc::new(MemoryVectorStore::new());
        let session = Arc::new(Session::new(settings.agent.max_history_messages));
        let chat = Arc::new(FakeChat::new("model answer"));
        let orchestrator = Arc::new(Orchestrator::new(
            settings,
            Arc::new(FakeSource::new(VIDEO, "Never Gonna", Some("never gonna give you up"))),
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
            session.clone(),
            &RagSettings::default(),
        ));
        let briefs = Arc::new(BriefGenerator::new(
            store,
            chat,
            orchestrator.clone(),
            Prompts::default(),
        ));
        let tools = ToolContext {
            orchestrator,
            rag,
            briefs,
            output_dir,
            default_pdf_name: "evrika_brief.pdf".to_string(),
        };
        Agent::new(model, tools, session, "system prompt", &settings.agent)
    }

    fn tool_outputs(messages: &[AgentMessage]) -> Vec<String> {
        messages
            .iter()
            .filter_map(|m| match m {
                AgentMessage::Tool { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_plain_reply_is_recorded() {
        let model = Arc::new(ScriptedModel::new(vec![reply("Hi there")]));
        let settings = Settings::default();
        let agent = agent(model.clone(), &settings, PathBuf::from("."));

        assert_eq!(agent.respond("hello").await.unwrap(), "Hi there");

        let history = agent.session.recent_history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[1].content, "Hi there");
    }

    #[tokio::test]
    async fn test_history_is_replayed() {
        let model = Arc::new(ScriptedModel::new(vec![reply("first"), reply("second")]));
        let settings = Settings::default();
        let agent = agent(model.clone(), &settings, PathBuf::from("."));

        agent.respond("one").await.unwrap();
        agent.respond("two").await.unwrap();

        let seen = model.seen();
        assert_eq!(
            seen[1],
            vec![
                AgentMessage::System("system prompt".to_string()),
                AgentMessage::User("one".to_string()),
                AgentMessage::Assistant {
                    content: Some("first".to_string()),
                    tool_calls: Vec::new()
                },
                AgentMessage::User("two".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let model = Arc::new(ScriptedModel::new(vec![
            call("c1", "get_transcript", "{}"),
            reply("sorry"),
        ]));
        let settings = Settings::default();
        let agent = agent(model.clone(), &settings, PathBuf::from("."));

        assert_eq!(agent.respond("transcript?").await.unwrap(), "sorry");
        let seen = model.seen();
        assert_eq!(
            tool_outputs(&seen[1]),
            vec!["Error: unknown tool 'get_transcript'.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_fetch_then_metadata_tools() {
        let model = Arc::new(ScriptedModel::new(vec![
            call("c1", "fetch_video", &format!(r#"{{"url": "https://youtu.be/{VIDEO}"}}"#)),
            call("c2", "video_metadata", "{}"),
            reply("It is by Test Channel."),
        ]));
        let settings = Settings::default();
        let agent = agent(model.clone(), &settings, PathBuf::from("."));

        agent.respond("ingest and describe").await.unwrap();

        let outputs = tool_outputs(&model.seen()[2]);
        assert_eq!(
            outputs[0],
            format!("Ingested video 'Never Gonna' (id={VIDEO}) into Evrika Briefs with 1 chunks.")
        );
        let meta: serde_json::Value = serde_json::from_str(&outputs[1]).unwrap();
        assert_eq!(meta["title"], "Never Gonna");
        assert_eq!(meta["channel"], "Test Channel");
    }

    #[tokio::test]
    async fn test_save_brief_as_pdf_tool() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new(vec![
            call("c1", "save_brief_as_pdf", r##"{"brief_text": "# Evrika Brief - X\n- point"}"##),
            reply("saved"),
        ]));
        let settings = Settings::default();
        let agent = agent(model.clone(), &settings, dir.path().to_path_buf());

        agent.respond("save it").await.unwrap();

        let pdf = dir.path().join("evrika_brief.pdf");
        assert!(pdf.exists());
        assert_eq!(tool_outputs(&model.seen()[1]), vec![pdf.display().to_string()]);
    }

    #[tokio::test]
    async fn test_iteration_guard() {
        let turns = (0..5).map(|i| call(&format!("c{i}"), "video_metadata", "{}")).collect();
        let model = Arc::new(ScriptedModel::new(turns));
        let mut settings = Settings::default();
        settings.agent.max_iterations = 3;
        let agent = agent(model.clone(), &settings, PathBuf::from("."));

        let err = agent.respond("loop").await.unwrap_err();
        assert!(matches!(err, EvrikaError::Agent(_)));
        assert_eq!(model.seen().len(), 3);
        assert!(agent.session.recent_history().await.is_empty());
    }
}
