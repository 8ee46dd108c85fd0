//! Response generation: transcript in, reply text and its spoken rendering out.
//!
//! One call performs two strictly ordered outbound requests. The chat
//! completion runs first, and speech synthesis only starts once its reply
//! text is available. Nothing is shared between calls except the read-only
//! system prompt and the providers themselves, so a single [`Responder`] can
//! serve any number of concurrent requests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    chat::{ChatMessage, ChatProvider},
    error::{LLMError, ResponderError},
    latin1,
    tts::TextToSpeechProvider,
};

/// Reply text together with its synthesized speech.
///
/// `audio_data` serializes as a latin-1 string, one character per byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedResponse {
    pub text_response: String,
    #[serde(
        serialize_with = "latin1::serialize",
        deserialize_with = "latin1::deserialize"
    )]
    pub audio_data: Vec<u8>,
}

/// Generates spoken replies to user transcripts.
#[derive(Clone)]
pub struct Responder {
    chat: Arc<dyn ChatProvider>,
    tts: Arc<dyn TextToSpeechProvider>,
    system_prompt: Arc<str>,
}

impl Responder {
    pub fn new(
        chat: Arc<dyn ChatProvider>,
        tts: Arc<dyn TextToSpeechProvider>,
        system_prompt: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            chat,
            tts,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// The two messages sent for a transcript: the system prompt, then the transcript.
    pub fn messages_for(&self, transcript: &str) -> [ChatMessage; 2] {
        [
            ChatMessage::system().content(&*self.system_prompt).build(),
            ChatMessage::user().content(transcript).build(),
        ]
    }

    /// Asks the chat provider for a reply and returns the first choice's text.
    pub async fn complete(&self, transcript: &str) -> Result<String, ResponderError> {
        let messages = self.messages_for(transcript);
        let response = self
            .chat
            .chat(&messages)
            .await
            .map_err(ResponderError::Provider)?;

        if let Some(usage) = response.usage() {
            log::debug!(
                "Completion used {} prompt + {} completion tokens",
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        response.text().ok_or_else(|| {
            ResponderError::Provider(LLMError::ProviderError(
                "completion returned no message content".to_string(),
            ))
        })
    }

    /// Generates the reply to `transcript` and renders it as speech.
    ///
    /// Either both the text and the audio are produced or the call fails as a
    /// whole. An empty transcript is forwarded to the chat provider unchanged.
    ///
    /// # Errors
    ///
    /// * [`ResponderError::Provider`] when the completion fails; synthesis is not attempted.
    /// * [`ResponderError::Synthesis`] when the reply could not be spoken.
    pub async fn generate_response(
        &self,
        transcript: &str,
    ) -> Result<GeneratedResponse, ResponderError> {
        log::info!(
            "Generating response for transcript of {} chars",
            transcript.chars().count()
        );

        let text_response = self.complete(transcript).await.map_err(|e| {
            log::debug!("{}", e);
            e
        })?;
        log::debug!("Reply has {} chars", text_response.chars().count());

        let audio_data = match self.tts.speech(&text_response).await {
            Ok(audio) => audio,
            Err(source) => {
                log::debug!("Speech synthesis failed: {}", source);
                return Err(ResponderError::Synthesis {
                    text_response,
                    source,
                });
            }
        };
        log::info!("Synthesized {} bytes of audio", audio_data.len());

        Ok(GeneratedResponse {
            text_response,
            audio_data,
        })
    }
}
