//! Runtime configuration for the voice responder service.
//!
//! Values come from command line flags or environment variables, with a `.env`
//! file in the working directory consulted first.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{
    builder::{ChatBackend, ResponderBuilder, TtsBackend},
    error::ResponderError,
    responder::Responder,
};

pub const DEFAULT_SYSTEM_PROMPT_PATH: &str = "system_prompt.txt";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_RETRY_ATTEMPTS: usize = 3;

/// Loads variables from a `.env` file in the working directory, if one
/// exists. Variables already set in the environment win.
///
/// Call before [`init_logging`](crate::init_logging) so `.env` may set
/// `RUST_LOG`; problems go to stderr. Returns the loaded file.
pub fn load_dotenv() -> Option<PathBuf> {
    report_dotenv(dotenvy::dotenv())
}

/// Same as [`load_dotenv`] for an explicit file.
pub fn load_dotenv_from(path: impl AsRef<Path>) -> Option<PathBuf> {
    let path = path.as_ref();
    report_dotenv(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}

fn report_dotenv(result: dotenvy::Result<PathBuf>) -> Option<PathBuf> {
    match result {
        Ok(path) => Some(path),
        Err(e) if e.not_found() => None,
        Err(e) => {
            eprintln!("Ignoring unreadable .env file: {}", e);
            None
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(clap::Parser))]
#[cfg_attr(
    feature = "cli",
    command(
        name = "voice-responder",
        about = "Answers voice-assistant transcripts with a chat reply and its speech audio"
    )
)]
pub struct Config {
    /// API key for the chat-completion provider
    #[cfg_attr(feature = "cli", arg(long, env = "OPENAI_API_KEY", hide_env_values = true))]
    pub api_key: Option<String>,

    /// File holding the system prompt, read once at startup
    #[cfg_attr(
        feature = "cli",
        arg(long, env = "SYSTEM_PROMPT_PATH", default_value = DEFAULT_SYSTEM_PROMPT_PATH)
    )]
    pub system_prompt_path: PathBuf,

    /// Chat model identifier
    #[cfg_attr(feature = "cli", arg(long, env = "OPENAI_MODEL"))]
    pub model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[cfg_attr(feature = "cli", arg(long, env = "OPENAI_BASE_URL"))]
    pub base_url: Option<String>,

    /// Speech backend: gtts or openai
    #[cfg_attr(feature = "cli", arg(long, env = "TTS_BACKEND", default_value = "gtts"))]
    pub tts_backend: String,

    /// Spoken language
    #[cfg_attr(feature = "cli", arg(long, env = "TTS_LANGUAGE", default_value = "ja"))]
    pub language: String,

    /// Top-level domain of the Google Translate host
    #[cfg_attr(feature = "cli", arg(long, env = "TTS_TLD", default_value = "com"))]
    pub tld: String,

    /// Timeout applied to every outbound request
    #[cfg_attr(
        feature = "cli",
        arg(long, env = "REQUEST_TIMEOUT_SECONDS", default_value_t = DEFAULT_TIMEOUT_SECONDS)
    )]
    pub timeout_seconds: u64,

    /// Attempts per outbound call, 1 disables retries
    #[cfg_attr(
        feature = "cli",
        arg(long, env = "RETRY_ATTEMPTS", default_value_t = DEFAULT_RETRY_ATTEMPTS)
    )]
    pub retry_attempts: usize,

    /// Address the HTTP server listens on
    #[cfg_attr(feature = "cli", arg(long, env = "BIND_ADDR", default_value = DEFAULT_BIND_ADDR))]
    pub bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            system_prompt_path: PathBuf::from(DEFAULT_SYSTEM_PROMPT_PATH),
            model: None,
            base_url: None,
            tts_backend: "gtts".to_string(),
            language: "ja".to_string(),
            tld: "com".to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            bind: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl Config {
    /// Reads the whole system prompt file.
    pub fn load_system_prompt(&self) -> Result<String, ResponderError> {
        std::fs::read_to_string(&self.system_prompt_path).map_err(|e| {
            ResponderError::configuration(format!(
                "Cannot read system prompt from {}: {}",
                self.system_prompt_path.display(),
                e
            ))
        })
    }

    /// Returns a builder with every setting applied except the system prompt.
    pub fn builder(&self) -> Result<ResponderBuilder, ResponderError> {
        let mut builder = ResponderBuilder::new()
            .chat_backend(ChatBackend::OpenAI)
            .tts_backend(TtsBackend::from_str(&self.tts_backend)?)
            .language(self.language.clone())
            .tld(self.tld.clone())
            .timeout_seconds(self.timeout_seconds);

        if let Some(key) = &self.api_key {
            builder = builder.api_key(key.clone());
        }
        if let Some(model) = &self.model {
            builder = builder.model(model.clone());
        }
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url.clone());
        }
        if self.retry_attempts > 1 {
            builder = builder
                .resilient(true)
                .resilient_attempts(self.retry_attempts);
        }
        Ok(builder)
    }

    /// Loads the system prompt and builds a ready [`Responder`].
    pub fn into_responder(&self) -> Result<Responder, ResponderError> {
        let prompt = self.load_system_prompt()?;
        log::info!(
            "Loaded system prompt from {} ({} chars)",
            self.system_prompt_path.display(),
            prompt.chars().count()
        );
        self.builder()?.system_prompt(prompt).build()
    }
}
