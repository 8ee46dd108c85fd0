//! Google Translate speech backend
//!
//! Speaks text through the endpoint the Translate web UI uses for its "listen"
//! button. Long text is split into chunks the endpoint accepts, each chunk is
//! synthesized separately and the MP3 pieces are concatenated in order.

use async_trait::async_trait;
use base64::Engine;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};

use crate::{backends::build_client, error::LLMError, tts::TextToSpeechProvider};

/// RPC identifier of the text-to-speech call inside `batchexecute`.
pub const GOOGLE_TTS_RPC: &str = "jQ1olc";
/// Longest text accepted by a single request, in characters.
pub const MAX_CHUNK_CHARS: usize = 100;
pub const DEFAULT_LANGUAGE: &str = "ja";
pub const DEFAULT_TLD: &str = "com";

const REFERER: &str = "http://translate.google.com/";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/47.0.2526.106 Safari/537.36";

/// Characters after which long text may be split.
fn is_split_point(c: char) -> bool {
    matches!(
        c,
        '.' | '?'
            | '!'
            | ';'
            | ':'
            | ','
            | '\n'
            | '。'
            | '、'
            | '！'
            | '？'
            | '；'
            | '：'
            | '，'
            | '．'
            | '…'
            | '‥'
    )
}

fn is_speakable(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

/// Splits `text` into pieces of at most `max` characters, preferring whitespace.
fn minimize(text: &str, max: usize, out: &mut Vec<String>) {
    let mut rest = text.trim();
    while rest.chars().count() > max {
        let limit = rest
            .char_indices()
            .nth(max)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let cut = rest[..limit]
            .rfind(char::is_whitespace)
            .filter(|&i| i > 0)
            .unwrap_or(limit);
        let piece = rest[..cut].trim();
        if is_speakable(piece) {
            out.push(piece.to_string());
        }
        rest = rest[cut..].trim_start();
    }
    if is_speakable(rest) {
        out.push(rest.to_string());
    }
}

/// Breaks text into request-sized chunks.
///
/// Text that already fits in one request is sent as is. Longer text is split
/// after punctuation first, then at whitespace, then hard at the limit.
/// Chunks with nothing to pronounce are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    let text = text.trim();
    let mut chunks = Vec::new();

    if text.chars().count() <= MAX_CHUNK_CHARS {
        if is_speakable(text) {
            chunks.push(text.to_string());
        }
        return chunks;
    }

    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if is_split_point(c) {
            minimize(&current, MAX_CHUNK_CHARS, &mut chunks);
            current.clear();
        }
    }
    minimize(&current, MAX_CHUNK_CHARS, &mut chunks);
    chunks
}

/// Google Translate text-to-speech client
pub struct GoogleTranslateTts {
    lang: String,
    slow: bool,
    endpoint: String,
    audio_pattern: Regex,
    client: Client,
}

impl GoogleTranslateTts {
    /// Creates a new client.
    ///
    /// # Arguments
    ///
    /// * `lang` - IETF language tag, `ja` when `None`
    /// * `tld` - top-level domain of the Translate host, `com` when `None`
    /// * `slow` - read the text more slowly
    /// * `timeout_seconds` - per-request timeout
    pub fn new(
        lang: Option<String>,
        tld: Option<String>,
        slow: bool,
        timeout_seconds: Option<u64>,
    ) -> Result<Self, LLMError> {
        let tld = tld.unwrap_or_else(|| DEFAULT_TLD.to_string());
        let audio_pattern = Regex::new(&format!(r#"{GOOGLE_TTS_RPC}","\[\\"(.*)\\"]"#))
            .map_err(|e| LLMError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            lang: lang.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            slow,
            endpoint: format!(
                "https://translate.google.{tld}/_/TranslateWebserverUi/data/batchexecute"
            ),
            audio_pattern,
            client: build_client(timeout_seconds)?,
        })
    }

    /// Overrides the `batchexecute` URL, e.g. to point at a proxy.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn language(&self) -> &str {
        &self.lang
    }

    /// Builds the `f.req` form value for one chunk.
    fn package_rpc(&self, text: &str) -> Result<String, LLMError> {
        let speed = if self.slow { Value::Bool(true) } else { Value::Null };
        let parameter = serde_json::to_string(&json!([text, self.lang, speed, "null"]))?;
        let rpc = json!([[[GOOGLE_TTS_RPC, parameter, Value::Null, "generic"]]]);
        Ok(serde_json::to_string(&rpc)?)
    }

    /// Extracts and decodes the audio carried by a `batchexecute` response.
    fn extract_audio(&self, body: &str) -> Result<Vec<u8>, LLMError> {
        let line = body
            .lines()
            .find(|line| line.contains(GOOGLE_TTS_RPC))
            .ok_or_else(|| {
                LLMError::ProviderError("Google Translate returned no audio".to_string())
            })?;

        let encoded = self
            .audio_pattern
            .captures(line)
            .and_then(|c| c.get(1))
            .ok_or_else(|| LLMError::ResponseFormatError {
                message: "Google Translate response carries no audio payload".to_string(),
                raw_response: line.to_string(),
            })?;

        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_str())
            .map_err(|e| LLMError::ResponseFormatError {
                message: format!("Invalid base64 audio: {e}"),
                raw_response: line.to_string(),
            })
    }

    async fn synthesize_chunk(&self, chunk: &str) -> Result<Vec<u8>, LLMError> {
        let rpc = self.package_rpc(chunk)?;

        let resp = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::REFERER, REFERER)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .form(&[("f.req", rpc)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LLMError::ProviderError(format!(
                "Google Translate returned {status}: {body}"
            )));
        }

        let body = resp.text().await?;
        self.extract_audio(&body)
    }
}

#[async_trait]
impl TextToSpeechProvider for GoogleTranslateTts {
    async fn speech(&self, text: &str) -> Result<Vec<u8>, LLMError> {
        let chunks = tokenize(text);
        if chunks.is_empty() {
            return Err(LLMError::InvalidRequest("No text to speak".to_string()));
        }

        log::debug!(
            "Synthesizing {} chunk(s) in '{}' with Google Translate",
            chunks.len(),
            self.lang
        );

        let mut audio = Vec::new();
        for chunk in &chunks {
            audio.extend(self.synthesize_chunk(chunk).await?);
        }
        Ok(audio)
    }
}
