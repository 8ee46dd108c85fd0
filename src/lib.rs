//! Voice responder: turns a voice-assistant transcript into a spoken reply.
//!
//! # Overview
//! Each request runs two steps in order:
//!
//! - A chat completion, with a fixed system prompt followed by the transcript
//! - Speech synthesis of the reply text
//!
//! The reply and its audio are returned together, the audio encoded one
//! character per byte so it fits in a JSON string.
//!
//! # Architecture
//! Providers sit behind the [`chat::ChatProvider`] and
//! [`tts::TextToSpeechProvider`] traits, are configured through
//! [`builder::ResponderBuilder`], and are composed by [`responder::Responder`].

// Re-export for convenience
pub use async_trait::async_trait;

/// Backend implementations: OpenAI chat/speech and Google Translate speech
pub mod backends;

/// Builder pattern for configuring and instantiating a responder
pub mod builder;

/// Chat-based interactions with language models
pub mod chat;

/// Runtime configuration from flags, environment and `.env`
pub mod config;

/// Error types and handling
pub mod error;

/// Byte-to-character transport encoding for audio
pub mod latin1;

/// Retry wrapper for providers
pub mod resilient_llm;

/// Transcript to reply text and audio
pub mod responder;

/// Text-to-speech support
pub mod tts;

#[cfg(feature = "api")]
pub mod api;

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
/// Defaults to `info` when `RUST_LOG` is unset.
/// This is a no-op if the feature is not enabled.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init();
    }
}
