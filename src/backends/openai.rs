//! OpenAI API client implementation
//!
//! Chat completions through `/chat/completions` and, as an alternative speech
//! backend, synthesis through `/audio/speech`. Any OpenAI-compatible server
//! can be targeted by overriding the base URL.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::{
    backends::build_client,
    chat::{ChatMessage, ChatProvider, ChatResponse, Usage},
    error::LLMError,
    tts::TextToSpeechProvider,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_SPEECH_MODEL: &str = "tts-1";
pub const DEFAULT_VOICE: &str = "alloy";

/// Client for OpenAI chat completions.
pub struct OpenAI {
    pub api_key: String,
    pub base_url: Url,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
    client: Client,
}

#[derive(Serialize, Debug)]
struct OpenAIChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize, Debug)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Deserialize, Debug)]
pub struct OpenAIChatResponse {
    pub choices: Vec<OpenAIChatChoice>,
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Debug)]
pub struct OpenAIChatChoice {
    pub message: OpenAIChatMsg,
}

#[derive(Deserialize, Debug)]
pub struct OpenAIChatMsg {
    pub role: String,
    pub content: Option<String>,
}

impl ChatResponse for OpenAIChatResponse {
    fn text(&self) -> Option<String> {
        self.choices.first().and_then(|c| c.message.content.clone())
    }

    fn usage(&self) -> Option<Usage> {
        self.usage.clone()
    }
}

impl std::fmt::Display for OpenAIChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text().unwrap_or_default())
    }
}

/// Parses a base URL, making sure relative joins keep its last path segment.
pub(crate) fn parse_base_url(base_url: Option<String>) -> Result<Url, LLMError> {
    let mut raw = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| LLMError::InvalidRequest(format!("Invalid base URL {raw}: {e}")))
}

/// Turns a non-success OpenAI response into the matching error variant.
async fn error_from_response(response: reqwest::Response) -> LLMError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LLMError::AuthError(format!("OpenAI rejected the credentials ({status}): {body}"))
        }
        StatusCode::TOO_MANY_REQUESTS => LLMError::RateLimited(body),
        _ => LLMError::ResponseFormatError {
            message: format!("OpenAI API returned error status: {status}"),
            raw_response: body,
        },
    }
}

impl OpenAI {
    /// Creates a new OpenAI chat client.
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        model: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        timeout_seconds: Option<u64>,
    ) -> Result<Self, LLMError> {
        Ok(Self {
            api_key: api_key.into(),
            base_url: parse_base_url(base_url)?,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens,
            temperature,
            timeout_seconds,
            client: build_client(timeout_seconds)?,
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAI {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        if self.api_key.is_empty() {
            return Err(LLMError::AuthError("Missing OpenAI API key".into()));
        }

        let body = OpenAIChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| OpenAIChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
        };

        let url = self
            .base_url
            .join("chat/completions")
            .map_err(|e| LLMError::HttpError(e.to_string()))?;

        if log::log_enabled!(log::Level::Trace) {
            if let Ok(json) = serde_json::to_string(&body) {
                log::trace!("OpenAI request payload: {}", json);
            }
        }

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        log::debug!("OpenAI HTTP status: {}", response.status());

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let resp_text = response.text().await?;
        match serde_json::from_str::<OpenAIChatResponse>(&resp_text) {
            Ok(response) => Ok(Box::new(response)),
            Err(e) => Err(LLMError::ResponseFormatError {
                message: format!("Failed to decode OpenAI API response: {e}"),
                raw_response: resp_text,
            }),
        }
    }
}

/// OpenAI `/audio/speech` synthesizer.
pub struct OpenAISpeech {
    api_key: String,
    base_url: Url,
    model: String,
    voice: String,
    client: Client,
}

impl OpenAISpeech {
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        model: Option<String>,
        voice: Option<String>,
        timeout_seconds: Option<u64>,
    ) -> Result<Self, LLMError> {
        Ok(Self {
            api_key: api_key.into(),
            base_url: parse_base_url(base_url)?,
            model: model.unwrap_or_else(|| DEFAULT_SPEECH_MODEL.to_string()),
            voice: voice.unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            client: build_client(timeout_seconds)?,
        })
    }
}

#[async_trait]
impl TextToSpeechProvider for OpenAISpeech {
    async fn speech(&self, text: &str) -> Result<Vec<u8>, LLMError> {
        if self.api_key.is_empty() {
            return Err(LLMError::AuthError("Missing OpenAI API key".into()));
        }

        let url = self
            .base_url
            .join("audio/speech")
            .map_err(|e| LLMError::HttpError(e.to_string()))?;

        #[derive(Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
        }

        let body = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
        };

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }

        Ok(resp.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatMessage;

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = parse_base_url(Some("http://localhost:1234/v1".into())).unwrap();
        assert_eq!(
            url.join("chat/completions").unwrap().as_str(),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            parse_base_url(Some("not a url".into())),
            Err(LLMError::InvalidRequest(_))
        ));
    }

    #[test]
    fn first_choice_is_the_reply() {
        let raw = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "一番目"}},
                {"message": {"role": "assistant", "content": "二番目"}}
            ],
            "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
        }"#;
        let parsed: OpenAIChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("一番目"));
        assert_eq!(parsed.usage().unwrap().total_tokens, 5);
    }

    #[tokio::test]
    async fn empty_key_fails_without_network() {
        let llm = OpenAI::new("", Some("http://127.0.0.1:9".into()), None, None, None, None)
            .unwrap();
        let err = llm
            .chat(&[ChatMessage::user().content("hi").build()])
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::AuthError(_)));
    }
}
