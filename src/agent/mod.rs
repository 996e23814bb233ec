//! Tool-calling chat agent.
//!
//! The model decides which video tools to call (ingest, search, answer,
//! brief, recommendations, PDF export, metadata) and the runner loops until
//! it replies in plain text.

mod runner;
mod tools;

pub use runner::{
    Agent, AgentMessage, ModelTurn, OpenAIToolModel, ToolCallingModel, ToolInvocation,
};
pub use tools::{parse_tool_call, sanitize_tool_output, tool_definitions, ToolCall, ToolContext};
