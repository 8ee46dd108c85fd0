use crate::error::LLMError;
use async_trait::async_trait;

/// Trait implemented by all text to speech backends
///
/// Implementors convert text into encoded audio held fully in memory.
#[async_trait]
pub trait TextToSpeechProvider: Send + Sync {
    /// Convert the given text into speech audio
    ///
    /// # Arguments
    ///
    /// * `text` - A string containing the text to convert to speech
    ///
    /// # Returns
    ///
    /// * `Result<Vec<u8>, LLMError>` - On success, returns the audio data as a vector of bytes.
    ///   On failure, returns an LLMError describing what went wrong.
    async fn speech(&self, text: &str) -> Result<Vec<u8>, LLMError>;
}
