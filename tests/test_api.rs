#![cfg(all(feature = "api", feature = "openai", feature = "gtts"))]

use std::sync::Arc;

use serde_json::{json, Value};
use voice_responder::{
    api::Server,
    async_trait,
    backends::google_translate::GoogleTranslateTts,
    builder::ResponderBuilder,
    chat::{ChatMessage, ChatProvider, ChatResponse},
    error::LLMError,
    latin1,
    responder::Responder,
    tts::TextToSpeechProvider,
};

#[derive(Debug)]
struct Canned(String);

impl std::fmt::Display for Canned {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ChatResponse for Canned {
    fn text(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Answers "こんにちは" like the assistant in the service docs, fails on "fail".
struct GreetingChat;

#[async_trait]
impl ChatProvider for GreetingChat {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        match messages[1].content.as_str() {
            "fail" => Err(LLMError::HttpError("connection refused".into())),
            "こんにちは" => Ok(Box::new(Canned("こんにちは、元気ですか？".into()))),
            other => Ok(Box::new(Canned(format!("「{other}」ですね。")))),
        }
    }
}

struct FixedAudio;

#[async_trait]
impl TextToSpeechProvider for FixedAudio {
    async fn speech(&self, _text: &str) -> Result<Vec<u8>, LLMError> {
        Ok(vec![0x00, 0xFF, 0x41])
    }
}

struct BrokenAudio;

#[async_trait]
impl TextToSpeechProvider for BrokenAudio {
    async fn speech(&self, _text: &str) -> Result<Vec<u8>, LLMError> {
        Err(LLMError::ProviderError("503".into()))
    }
}

async fn spawn_server(responder: Responder) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(Server::new(responder).serve(listener));
    format!("http://{addr}")
}

fn responder(tts: Arc<dyn TextToSpeechProvider>) -> Responder {
    Responder::new(Arc::new(GreetingChat), tts, "あなたは親切なアシスタントです。")
}

#[tokio::test]
async fn generates_text_and_latin1_audio() {
    let base = spawn_server(responder(Arc::new(FixedAudio))).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/generate-response/"))
        .json(&json!({"transcript": "こんにちは"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["text_response"], "こんにちは、元気ですか？");
    let audio = body["audio_data"].as_str().unwrap();
    assert_eq!(audio, "\u{0}\u{ff}A");
    assert_eq!(latin1::decode(audio).unwrap(), vec![0x00, 0xFF, 0x41]);
}

#[tokio::test]
async fn path_without_trailing_slash_is_served() {
    let base = spawn_server(responder(Arc::new(FixedAudio))).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/generate-response"))
        .json(&json!({"transcript": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["text_response"], "「」ですね。");
}

#[tokio::test]
async fn completion_failure_is_bad_gateway() {
    let base = spawn_server(responder(Arc::new(FixedAudio))).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/generate-response/"))
        .json(&json!({"transcript": "fail"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"detail": "chat completion failed"}));
}

#[tokio::test]
async fn synthesis_failure_is_bad_gateway() {
    let base = spawn_server(responder(Arc::new(BrokenAudio))).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/generate-response/"))
        .json(&json!({"transcript": "こんにちは"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"detail": "speech synthesis failed"}));
}

#[tokio::test]
async fn missing_transcript_is_rejected() {
    let base = spawn_server(responder(Arc::new(FixedAudio))).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/generate-response/"))
        .json(&json!({"text": "こんにちは"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
}

#[tokio::test]
async fn health_reports_ok() {
    let base = spawn_server(responder(Arc::new(FixedAudio))).await;

    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn cors_allows_any_origin_with_credentials() {
    let base = spawn_server(responder(Arc::new(FixedAudio))).await;

    let resp = reqwest::Client::new()
        .request(
            reqwest::Method::OPTIONS,
            format!("{base}/generate-response/"),
        )
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_success());
    let headers = resp.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "http://localhost:3000"
    );
    assert_eq!(headers["access-control-allow-credentials"], "true");
    assert_eq!(headers["access-control-allow-methods"], "POST");
}

#[tokio::test]
async fn end_to_end_against_mocked_providers() {
    let mut openai = mockito::Server::new_async().await;
    openai
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "choices": [{"message": {"role": "assistant", "content": "こんにちは、元気ですか？"}}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let mut translate = mockito::Server::new_async().await;
    translate
        .mock("POST", "/batchexecute")
        .with_status(200)
        .with_body(")]}'\n\n[[\"wrb.fr\",\"jQ1olc\",\"[\\\"AP9B\\\"]\",null,null,null,\"generic\"]]\n")
        .create_async()
        .await;

    let tts = GoogleTranslateTts::new(None, None, false, Some(5))
        .unwrap()
        .with_endpoint(format!("{}/batchexecute", translate.url()));
    let responder = ResponderBuilder::new()
        .api_key("sk-test")
        .base_url(format!("{}/v1", openai.url()))
        .system_prompt("あなたは親切なアシスタントです。")
        .tts_provider(Arc::new(tts))
        .build()
        .unwrap();
    let base = spawn_server(responder).await;

    let body: Value = reqwest::Client::new()
        .post(format!("{base}/generate-response/"))
        .json(&json!({"transcript": "こんにちは"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["text_response"], "こんにちは、元気ですか？");
    assert_eq!(body["audio_data"], "\u{0}\u{ff}A");
}
