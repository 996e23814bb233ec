//! Configuration module for Evrika.
//!
//! Handles loading application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, BriefPrompts, Prompts, QaPrompts};
pub use settings::{
    AgentSettings, BriefSettings, ChunkingSettings, EmbeddingSettings, GeneralSettings,
    PromptSettings, RagSettings, ServerSettings, Settings, TranscriptionSettings,
    VectorStoreProvider, VectorStoreSettings, VoiceSettings,
};
