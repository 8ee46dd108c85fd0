//! Builder module for configuring and instantiating a [`Responder`].
//!
//! Selects and configures the chat-completion and speech backends, optionally
//! wraps them with retries, and pairs them with the system prompt.

use std::sync::Arc;

use crate::{
    chat::ChatProvider,
    error::ResponderError,
    resilient_llm::{ResilienceConfig, ResilientLLM},
    responder::Responder,
    tts::TextToSpeechProvider,
};

/// Supported chat-completion backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatBackend {
    /// OpenAI API, or any server exposing the same `/chat/completions` endpoint
    #[default]
    OpenAI,
}

/// Supported speech synthesis backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtsBackend {
    /// Google Translate speech, the same voice the gTTS library produces
    #[default]
    GoogleTranslate,
    /// OpenAI `/audio/speech`
    OpenAI,
}

/// Implements string parsing for ChatBackend enum. The parsing is case-insensitive.
///
/// ```
/// use std::str::FromStr;
/// use voice_responder::builder::ChatBackend;
///
/// assert_eq!(ChatBackend::from_str("OpenAI").unwrap(), ChatBackend::OpenAI);
/// assert!(ChatBackend::from_str("nope").is_err());
/// ```
impl std::str::FromStr for ChatBackend {
    type Err = ResponderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ChatBackend::OpenAI),
            _ => Err(ResponderError::configuration(format!(
                "Unknown chat backend: {}",
                s
            ))),
        }
    }
}

/// Implements string parsing for TtsBackend enum. The parsing is case-insensitive.
///
/// ```
/// use std::str::FromStr;
/// use voice_responder::builder::TtsBackend;
///
/// assert_eq!(TtsBackend::from_str("gtts").unwrap(), TtsBackend::GoogleTranslate);
/// assert_eq!(TtsBackend::from_str("openai").unwrap(), TtsBackend::OpenAI);
/// ```
impl std::str::FromStr for TtsBackend {
    type Err = ResponderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gtts" | "google" | "google-translate" => Ok(TtsBackend::GoogleTranslate),
            "openai" => Ok(TtsBackend::OpenAI),
            _ => Err(ResponderError::configuration(format!(
                "Unknown speech backend: {}",
                s
            ))),
        }
    }
}

/// Builder for configuring and instantiating a [`Responder`].
#[derive(Default)]
pub struct ResponderBuilder {
    /// Selected chat backend
    chat_backend: ChatBackend,
    /// Selected speech backend
    tts_backend: TtsBackend,
    /// API key for the chat provider
    api_key: Option<String>,
    /// Base URL for the chat provider (OpenAI-compatible servers)
    base_url: Option<String>,
    /// Chat model identifier
    model: Option<String>,
    /// Maximum tokens to generate in replies
    max_tokens: Option<u32>,
    /// Sampling temperature
    temperature: Option<f32>,
    /// Timeout in seconds applied to every outbound request
    timeout_seconds: Option<u64>,
    /// Persona instructions sent before each transcript
    system_prompt: Option<String>,
    /// Spoken language
    language: Option<String>,
    /// Google Translate host top-level domain
    tld: Option<String>,
    /// Slow speech (Google Translate only)
    slow: bool,
    /// Voice (OpenAI speech only)
    voice: Option<String>,
    /// Wrap both providers with retries
    resilient: bool,
    resilient_attempts: Option<usize>,
    resilient_backoff: Option<(u64, u64)>,
    /// Pre-built providers, mostly for tests and embedding
    chat_provider: Option<Arc<dyn ChatProvider>>,
    tts_provider: Option<Arc<dyn TextToSpeechProvider>>,
}

impl ResponderBuilder {
    /// Creates a new empty builder instance with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the chat-completion backend.
    pub fn chat_backend(mut self, backend: ChatBackend) -> Self {
        self.chat_backend = backend;
        self
    }

    /// Sets the speech synthesis backend.
    pub fn tts_backend(mut self, backend: TtsBackend) -> Self {
        self.tts_backend = backend;
        self
    }

    /// Sets the API key for authentication.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL for API requests.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model identifier to use.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the maximum number of tokens to generate.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the temperature for controlling response randomness.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the request timeout in seconds.
    pub fn timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Sets the system prompt.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the spoken language, `ja` by default.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn tld(mut self, tld: impl Into<String>) -> Self {
        self.tld = Some(tld.into());
        self
    }

    pub fn slow(mut self, slow: bool) -> Self {
        self.slow = slow;
        self
    }

    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Enables retries with exponential backoff for both providers.
    pub fn resilient(mut self, enabled: bool) -> Self {
        self.resilient = enabled;
        self
    }

    /// Sets the maximum number of attempts, the first one included.
    pub fn resilient_attempts(mut self, attempts: usize) -> Self {
        self.resilient_attempts = Some(attempts);
        self
    }

    /// Sets the initial and maximum backoff delays in milliseconds.
    pub fn resilient_backoff(mut self, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.resilient_backoff = Some((base_delay_ms, max_delay_ms));
        self
    }

    /// Uses an already constructed chat provider instead of a backend.
    pub fn chat_provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.chat_provider = Some(provider);
        self
    }

    /// Uses an already constructed speech provider instead of a backend.
    pub fn tts_provider(mut self, provider: Arc<dyn TextToSpeechProvider>) -> Self {
        self.tts_provider = Some(provider);
        self
    }

    fn resilience_config(&self) -> ResilienceConfig {
        let mut cfg = ResilienceConfig::defaults();
        if let Some(attempts) = self.resilient_attempts {
            cfg.max_attempts = attempts;
        }
        if let Some((base, max)) = self.resilient_backoff {
            cfg.base_delay_ms = base;
            cfg.max_delay_ms = max;
        }
        cfg
    }

    fn require_api_key(&self) -> Result<String, ResponderError> {
        match &self.api_key {
            Some(key) if !key.trim().is_empty() => Ok(key.clone()),
            _ => Err(ResponderError::configuration("No API key provided")),
        }
    }

    #[allow(unused_variables)]
    fn build_chat(&self) -> Result<Box<dyn ChatProvider>, ResponderError> {
        match self.chat_backend {
            ChatBackend::OpenAI => {
                #[cfg(not(feature = "openai"))]
                return Err(ResponderError::configuration(
                    "OpenAI feature not enabled",
                ));

                #[cfg(feature = "openai")]
                {
                    let llm = crate::backends::openai::OpenAI::new(
                        self.require_api_key()?,
                        self.base_url.clone(),
                        self.model.clone(),
                        self.max_tokens,
                        self.temperature,
                        self.timeout_seconds,
                    )
                    .map_err(|e| ResponderError::configuration(e.to_string()))?;
                    Ok(Box::new(llm))
                }
            }
        }
    }

    #[allow(unused_variables)]
    fn build_tts(&self) -> Result<Box<dyn TextToSpeechProvider>, ResponderError> {
        match self.tts_backend {
            TtsBackend::GoogleTranslate => {
                #[cfg(not(feature = "gtts"))]
                return Err(ResponderError::configuration(
                    "Google Translate speech feature not enabled",
                ));

                #[cfg(feature = "gtts")]
                {
                    let tts = crate::backends::google_translate::GoogleTranslateTts::new(
                        self.language.clone(),
                        self.tld.clone(),
                        self.slow,
                        self.timeout_seconds,
                    )
                    .map_err(|e| ResponderError::configuration(e.to_string()))?;
                    Ok(Box::new(tts))
                }
            }
            TtsBackend::OpenAI => {
                #[cfg(not(feature = "openai"))]
                return Err(ResponderError::configuration(
                    "OpenAI feature not enabled",
                ));

                #[cfg(feature = "openai")]
                {
                    let tts = crate::backends::openai::OpenAISpeech::new(
                        self.require_api_key()?,
                        self.base_url.clone(),
                        None,
                        self.voice.clone(),
                        self.timeout_seconds,
                    )
                    .map_err(|e| ResponderError::configuration(e.to_string()))?;
                    Ok(Box::new(tts))
                }
            }
        }
    }

    /// Builds and returns a configured [`Responder`].
    ///
    /// # Errors
    ///
    /// Returns [`ResponderError::Configuration`] if:
    /// - No system prompt is set
    /// - The API key is missing or blank
    /// - The selected backend's feature is not enabled
    pub fn build(self) -> Result<Responder, ResponderError> {
        let system_prompt = self
            .system_prompt
            .clone()
            .ok_or_else(|| ResponderError::configuration("No system prompt provided"))?;

        let chat: Arc<dyn ChatProvider> = match self.chat_provider.clone() {
            Some(provider) => provider,
            None if self.resilient => Arc::new(ResilientLLM::new(
                self.build_chat()?,
                self.resilience_config(),
            )),
            None => Arc::from(self.build_chat()?),
        };

        let tts: Arc<dyn TextToSpeechProvider> = match self.tts_provider.clone() {
            Some(provider) => provider,
            None if self.resilient => Arc::new(ResilientLLM::new(
                self.build_tts()?,
                self.resilience_config(),
            )),
            None => Arc::from(self.build_tts()?),
        };

        log::debug!(
            "Built responder with {:?} chat and {:?} speech backends",
            self.chat_backend,
            self.tts_backend
        );

        Ok(Responder::new(chat, tts, system_prompt))
    }
}
