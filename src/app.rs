//! Wiring of the long-lived services shared by the CLI and the HTTP API.

use crate::agent::{Agent, OpenAIToolModel, ToolCallingModel, ToolContext};
use crate::brief::BriefGenerator;
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::llm::{ChatModel, OpenAIChatModel};
use crate::orchestrator::Orchestrator;
use crate::rag::RagEngine;
use crate::session::Session;
use crate::transcription::{Transcriber, WhisperTranscriber};
use crate::vector_store::{open_store, VectorStore};
use crate::voice::{OpenAISpeech, SpeechSynthesizer, VoiceService};
use crate::youtube::{VideoSource, YtDlpSource};
use std::sync::Arc;
use tracing::info;

/// External capabilities the services are built on.
pub struct Backends {
    pub store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn Embedder>,
    pub llm: Arc<dyn ChatModel>,
    pub source: Arc<dyn VideoSource>,
    pub transcriber: Arc<dyn Transcriber>,
    pub voice_transcriber: Arc<dyn Transcriber>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub agent_model: Arc<dyn ToolCallingModel>,
}

impl Backends {
    /// Production backends: the configured store, OpenAI models, yt-dlp and Whisper.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let temp_dir = settings.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;

        let transcription = &settings.transcription;
        Ok(Self {
            store: open_store(settings)?,
            embedder: Arc::new(OpenAIEmbedder::with_config(
                &settings.embedding.model,
                settings.embedding.dimensions as usize,
            )),
            llm: Arc::new(OpenAIChatModel::new(&settings.rag.model, settings.rag.temperature)),
            source: Arc::new(YtDlpSource::new(
                temp_dir.clone(),
                transcription.audio_quality_kbps,
                transcription.caption_languages.clone(),
            )),
            transcriber: Arc::new(WhisperTranscriber::new(
                &transcription.model,
                transcription.max_upload_bytes,
                transcription.max_concurrent_parts,
                temp_dir.clone(),
            )),
            voice_transcriber: Arc::new(WhisperTranscriber::new(
                &settings.voice.stt_model,
                transcription.max_upload_bytes,
                1,
                temp_dir,
            )),
            speech: Arc::new(OpenAISpeech::new(&settings.voice.tts_model, &settings.voice.tts_voice)),
            agent_model: Arc::new(OpenAIToolModel::new(&settings.agent.model)),
        })
    }
}

/// Everything a request handler or command needs, built once per process.
pub struct Services {
    pub settings: Settings,
    pub store: Arc<dyn VectorStore>,
    pub session: Arc<Session>,
    pub orchestrator: Arc<Orchestrator>,
    pub rag: Arc<RagEngine>,
    pub briefs: Arc<BriefGenerator>,
    pub voice: VoiceService,
    pub agent: Agent,
}

impl Services {
    /// Load prompts and build production services.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let backends = Backends::from_settings(&settings)?;
        info!("Using {} vector store", backends.store.name());
        Ok(Self::assemble(settings, prompts, backends))
    }

    /// Build services on top of the given backends.
    pub fn assemble(settings: Settings, prompts: Prompts, backends: Backends) -> Self {
        let session = Arc::new(Session::new(settings.agent.max_history_messages));

        let orchestrator = Arc::new(Orchestrator::new(
            &settings,
            backends.source,
            backends.transcriber,
            backends.embedder.clone(),
            backends.store.clone(),
            session.clone(),
        ));
        let rag = Arc::new(RagEngine::new(
            backends.store.clone(),
            backends.embedder,
            backends.llm.clone(),
            prompts.clone(),
            session.clone(),
            &settings.rag,
        ));
        let briefs = Arc::new(BriefGenerator::new(
            backends.store.clone(),
            backends.llm,
            orchestrator.clone(),
            prompts.clone(),
        ));
        let voice = VoiceService::new(backends.voice_transcriber, backends.speech);

        let tools = ToolContext {
            orchestrator: orchestrator.clone(),
            rag: rag.clone(),
            briefs: briefs.clone(),
            output_dir: settings.brief_output_dir(),
            default_pdf_name: settings.brief.pdf_filename.clone(),
        };
        let agent = Agent::new(
            backends.agent_model,
            tools,
            session.clone(),
            &prompts.agent.system,
            &settings.agent,
        );

        Self {
            settings,
            store: backends.store,
            session,
            orchestrator,
            rag,
            briefs,
            voice,
            agent,
        }
    }
}
