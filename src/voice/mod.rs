//! Spoken questions in, spoken answers out.

use crate::audio::convert_to_wav;
use crate::error::{EvrikaError, Result};
use crate::openai::{create_client, OpenAIClient};
use crate::transcription::Transcriber;
use async_openai::types::{CreateSpeechRequestArgs, SpeechModel, SpeechResponseFormat, Voice};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// MIME type of synthesized answers.
pub const SPEECH_MIME: &str = "audio/mpeg";

/// Text-to-speech backend.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` as MP3 audio.
    async fn speak(&self, text: &str) -> Result<Vec<u8>>;
}

/// OpenAI text-to-speech.
pub struct OpenAISpeech {
    client: OpenAIClient,
    model: String,
    voice: Voice,
}

impl OpenAISpeech {
    pub fn new(model: &str, voice: &str) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            voice: parse_voice(voice),
        }
    }
}

/// Map a configured voice name onto the API enum. Unknown names use `nova`.
pub fn parse_voice(name: &str) -> Voice {
    match name.trim().to_lowercase().as_str() {
        "alloy" => Voice::Alloy,
        "echo" => Voice::Echo,
        "fable" => Voice::Fable,
        "onyx" => Voice::Onyx,
        "shimmer" => Voice::Shimmer,
        _ => Voice::Nova,
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAISpeech {
    #[instrument(skip(self, text), fields(model = %self.model, len = text.len()))]
    async fn speak(&self, text: &str) -> Result<Vec<u8>> {
        let request = CreateSpeechRequestArgs::default()
            .input(text)
            .model(SpeechModel::Other(self.model.clone()))
            .voice(self.voice.clone())
            .response_format(SpeechResponseFormat::Mp3)
            .build()
            .map_err(|e| EvrikaError::OpenAI(format!("Failed to build speech request: {}", e)))?;

        let response = self
            .client
            .audio()
            .speech(request)
            .await
            .map_err(|e| EvrikaError::OpenAI(format!("Speech API error: {}", e)))?;

        Ok(response.bytes.to_vec())
    }
}

/// Voice question answering glue: speech-to-text for questions and
/// text-to-speech for answers.
pub struct VoiceService {
    transcriber: Arc<dyn Transcriber>,
    speech: Arc<dyn SpeechSynthesizer>,
}

impl VoiceService {
    pub fn new(transcriber: Arc<dyn Transcriber>, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        Self { transcriber, speech }
    }

    /// Decode a browser recording and transcribe it into a question.
    #[instrument(skip_all, fields(len = bytes.len()))]
    pub async fn transcribe_question(&self, bytes: &[u8]) -> Result<String> {
        let wav = convert_to_wav(bytes).await?;
        let text = self.transcriber.transcribe_bytes("voice.wav", wav).await?;
        debug!("Transcribed question: {:?}", text);
        Ok(text.trim().to_string())
    }

    /// Speak an answer. Blank text yields empty audio without an API call.
    pub async fn synthesize(&self, text: &str) -> Result<(Vec<u8>, String)> {
        if text.trim().is_empty() {
            return Ok((Vec::new(), SPEECH_MIME.to_string()));
        }
        let audio = self.speech.speak(text).await?;
        Ok((audio, SPEECH_MIME.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTranscriber;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSpeech(AtomicUsize);

    #[async_trait]
    impl SpeechSynthesizer for CountingSpeech {
        async fn speak(&self, text: &str) -> Result<Vec<u8>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(text.as_bytes().to_vec())
        }
    }

    fn service() -> (VoiceService, Arc<CountingSpeech>) {
        let speech = Arc::new(CountingSpeech(AtomicUsize::new(0)));
        let service = VoiceService::new(
            Arc::new(FakeTranscriber(Some("  what is deep work?  ".to_string()))),
            speech.clone(),
        );
        (service, speech)
    }

    #[tokio::test]
    async fn test_blank_answer_skips_synthesis() {
        let (service, speech) = service();
        let (audio, mime) = service.synthesize("   ").await.unwrap();
        assert!(audio.is_empty());
        assert_eq!(mime, "audio/mpeg");
        assert_eq!(speech.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_synthesize_returns_mp3() {
        let (service, speech) = service();
        let (audio, mime) = service.synthesize("hello").await.unwrap();
        assert_eq!(audio, b"hello");
        assert_eq!(mime, SPEECH_MIME);
        assert_eq!(speech.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_recording_is_rejected() {
        let (service, _) = service();
        assert!(matches!(
            service.transcribe_question(&[]).await,
            Err(EvrikaError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_parse_voice() {
        assert!(matches!(parse_voice("Onyx"), Voice::Onyx));
        assert!(matches!(parse_voice("nova"), Voice::Nova));
        assert!(matches!(parse_voice("unknown"), Voice::Nova));
    }
}
