//! Configuration settings for Evrika.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub transcription: TranscriptionSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub vector_store: VectorStoreSettings,
    pub rag: RagSettings,
    pub agent: AgentSettings,
    pub voice: VoiceSettings,
    pub brief: BriefSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for downloaded audio and other temporary files.
    pub temp_dir: String,
    /// Log level without `-v` (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.evrika".to_string(),
            temp_dir: "/tmp/evrika".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model.
    pub model: String,
    /// Upload size limit per request; larger files are split.
    pub max_upload_bytes: u64,
    /// Maximum concurrent part uploads.
    pub max_concurrent_parts: usize,
    /// Try published captions before downloading audio.
    pub prefer_captions: bool,
    /// Caption languages, in order of preference.
    pub caption_languages: Vec<String>,
    /// Audio bitrate for yt-dlp extraction (kbps).
    pub audio_quality_kbps: u32,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            max_upload_bytes: 24 * 1024 * 1024,
            max_concurrent_parts: 2,
            prefer_captions: true,
            caption_languages: vec!["en".to_string(), "en-US".to_string(), "en-GB".to_string()],
            audio_quality_kbps: 96,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Words per chunk.
    pub chunk_size_words: usize,
    /// Words shared between consecutive chunks.
    pub overlap_words: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size_words: 800,
            overlap_words: 200,
        }
    }
}

/// Vector store backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Local SQLite file.
    #[default]
    Sqlite,
    /// Supabase (Postgres + pgvector) over its REST API.
    Supabase,
    /// Process memory only.
    Memory,
}

impl std::str::FromStr for VectorStoreProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(VectorStoreProvider::Sqlite),
            "supabase" | "pgvector" => Ok(VectorStoreProvider::Supabase),
            "memory" => Ok(VectorStoreProvider::Memory),
            _ => Err(format!("Unknown vector store provider: {}", s)),
        }
    }
}

impl std::fmt::Display for VectorStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorStoreProvider::Sqlite => write!(f, "sqlite"),
            VectorStoreProvider::Supabase => write!(f, "supabase"),
            VectorStoreProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    pub provider: VectorStoreProvider,
    /// Path to SQLite database (sqlite provider).
    pub sqlite_path: String,
    /// Supabase project URL. Falls back to `SUPABASE_URL`.
    pub supabase_url: Option<String>,
    /// Table holding the chunks.
    pub table: String,
    /// Similarity search stored procedure.
    pub match_function: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::Sqlite,
            sqlite_path: "~/.evrika/vectors.db".to_string(),
            supabase_url: None,
            table: "documents".to_string(),
            match_function: "match_documents".to_string(),
        }
    }
}

/// Question answering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Chat model for answers, briefs and recommendations.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Number of chunks placed in the answer prompt.
    pub match_count: usize,
    /// Number of chunks used as context for recommendations.
    pub recommendation_chunks: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            match_count: 6,
            recommendation_chunks: 5,
        }
    }
}

/// Tool-calling chat agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub model: String,
    /// Number of previous messages replayed to the model.
    pub max_history_messages: usize,
    /// Hard cap for any single tool output.
    pub max_tool_output_chars: usize,
    /// Upper bound on model calls per user message.
    pub max_iterations: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_history_messages: 12,
            max_tool_output_chars: 40_000,
            max_iterations: 10,
        }
    }
}

/// Voice question/answer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub stt_model: String,
    pub tts_model: String,
    pub tts_voice: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stt_model: "whisper-1".to_string(),
            tts_model: "gpt-4o-mini-tts".to_string(),
            tts_voice: "nova".to_string(),
        }
    }
}

/// Brief export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BriefSettings {
    /// File name used for PDF downloads and agent exports.
    pub pdf_filename: String,
    /// Directory where the agent saves PDFs.
    pub output_dir: String,
}

impl Default for BriefSettings {
    fn default() -> Self {
        Self {
            pdf_filename: "evrika_brief.pdf".to_string(),
            output_dir: ".".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upload limit for voice clips.
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env();
        Ok(settings)
    }

    /// Environment overrides; these win over the config file.
    fn apply_env(&mut self) {
        if let Ok(provider) = std::env::var("EVRIKA_VECTOR_STORE") {
            match provider.parse() {
                Ok(p) => self.vector_store.provider = p,
                Err(e) => tracing::warn!("Ignoring EVRIKA_VECTOR_STORE: {}", e),
            }
        }
        if self.vector_store.supabase_url.is_none() {
            self.vector_store.supabase_url = std::env::var("SUPABASE_URL").ok().filter(|u| !u.is_empty());
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::EvrikaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("evrika")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    pub fn brief_output_dir(&self) -> PathBuf {
        Self::expand_path(&self.brief.output_dir)
    }

    /// Supabase service key from the environment.
    pub fn supabase_service_key() -> crate::error::Result<String> {
        match std::env::var("SUPABASE_SERVICE_KEY") {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(crate::error::EvrikaError::Config(
                "Environment variable SUPABASE_SERVICE_KEY is not set. \
                 Set it in your shell or in a .env file."
                    .to_string(),
            )),
        }
    }
}
