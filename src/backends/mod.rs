use std::time::Duration;

use reqwest::Client;

use crate::error::LLMError;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "gtts")]
pub mod google_translate;

/// Builds the HTTP client shared by a backend, bounding every request by `timeout_seconds`.
pub(crate) fn build_client(timeout_seconds: Option<u64>) -> Result<Client, LLMError> {
    let mut builder = Client::builder();
    if let Some(sec) = timeout_seconds {
        builder = builder.timeout(Duration::from_secs(sec));
    }
    builder
        .build()
        .map_err(|e| LLMError::HttpError(format!("Failed to build HTTP client: {e}")))
}
