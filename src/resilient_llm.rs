//! Resilience wrapper providing retry with exponential backoff for chat and speech providers.
//!
//! Transient failures (network errors, provider errors, rate limiting, malformed
//! responses) are retried with exponential backoff and jitter. Permanent errors
//! like authentication failures or invalid requests are returned immediately.
//!
//! # Example
//!
//! ```no_run
//! use voice_responder::backends::openai::OpenAI;
//! use voice_responder::resilient_llm::{ResilienceConfig, ResilientLLM};
//!
//! let llm = OpenAI::new("sk-...", None, None, None, None, Some(30)).unwrap();
//! let llm = ResilientLLM::new(Box::new(llm), ResilienceConfig::defaults());
//! ```
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::chat::{ChatMessage, ChatProvider, ChatResponse};
use crate::error::LLMError;
use crate::tts::TextToSpeechProvider;

/// Configuration for retry and backoff behavior.
#[derive(Clone, Debug)]
pub struct ResilienceConfig {
    /// Maximum number of attempts including the first one
    pub max_attempts: usize,
    /// Initial backoff delay in milliseconds
    pub base_delay_ms: u64,
    /// Maximum backoff delay in milliseconds
    pub max_delay_ms: u64,
    /// Whether to add jitter to backoff delays
    pub jitter: bool,
}

impl ResilienceConfig {
    /// Creates a default configuration with sane values.
    pub fn defaults() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2_000,
            jitter: true,
        }
    }
}

/// Resilient wrapper that retries transient failures using exponential backoff.
///
/// Wraps either a [`ChatProvider`] or a [`TextToSpeechProvider`].
pub struct ResilientLLM<P: ?Sized> {
    inner: Box<P>,
    cfg: ResilienceConfig,
}

impl<P: ?Sized> ResilientLLM<P> {
    /// Creates a new resilient wrapper around an existing provider.
    pub fn new(inner: Box<P>, cfg: ResilienceConfig) -> Self {
        Self { inner, cfg }
    }

    pub(crate) fn is_retryable(err: &LLMError) -> bool {
        match err {
            LLMError::HttpError(_) => true,
            LLMError::ProviderError(_) => true,
            LLMError::RateLimited(_) => true,
            LLMError::ResponseFormatError { .. } => true,
            LLMError::JsonError(_) => true,
            LLMError::RetryExceeded { .. } => false,
            LLMError::AuthError(_) => false,
            LLMError::InvalidRequest(_) => false,
        }
    }

    pub(crate) fn backoff_delay(&self, attempt_index: usize) -> Duration {
        let mut delay = self
            .cfg
            .base_delay_ms
            .saturating_mul(1u64 << attempt_index.min(16));
        delay = delay.min(self.cfg.max_delay_ms);
        if self.cfg.jitter {
            // Deterministic jitter only; no RNG
            let span = (delay / 2).max(1);
            let jitter = ((attempt_index as u64)
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1))
                % span;
            delay = delay.saturating_sub(jitter);
        }
        Duration::from_millis(delay)
    }

    // no generic retry function; per-method retries inline to keep Send bounds simple
}

#[async_trait]
impl<P: ChatProvider + ?Sized> ChatProvider for ResilientLLM<P> {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
        let attempts = self.cfg.max_attempts.max(1);
        let mut last_err: Option<LLMError> = None;
        for idx in 0..attempts {
            match self.inner.chat(messages).await {
                Ok(v) => return Ok(v),
                Err(e) if !Self::is_retryable(&e) => return Err(e),
                Err(e) => {
                    if idx + 1 < attempts {
                        log::warn!("Chat attempt {} failed, retrying: {}", idx + 1, e);
                        sleep(self.backoff_delay(idx)).await;
                    }
                    last_err = Some(e);
                }
            }
        }
        Err(LLMError::RetryExceeded {
            attempts,
            last_error: last_err.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

#[async_trait]
impl<P: TextToSpeechProvider + ?Sized> TextToSpeechProvider for ResilientLLM<P> {
    async fn speech(&self, text: &str) -> Result<Vec<u8>, LLMError> {
        let attempts = self.cfg.max_attempts.max(1);
        let mut last_err: Option<LLMError> = None;
        for idx in 0..attempts {
            match self.inner.speech(text).await {
                Ok(v) => return Ok(v),
                Err(e) if !Self::is_retryable(&e) => return Err(e),
                Err(e) => {
                    if idx + 1 < attempts {
                        log::warn!("Speech attempt {} failed, retrying: {}", idx + 1, e);
                        sleep(self.backoff_delay(idx)).await;
                    }
                    last_err = Some(e);
                }
            }
        }
        Err(LLMError::RetryExceeded {
            attempts,
            last_error: last_err.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Flaky {
        calls: Arc<AtomicUsize>,
        failures: usize,
        error: fn() -> LLMError,
    }

    #[async_trait]
    impl TextToSpeechProvider for Flaky {
        async fn speech(&self, _text: &str) -> Result<Vec<u8>, LLMError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err((self.error)())
            } else {
                Ok(vec![1, 2, 3])
            }
        }
    }

    fn fast() -> ResilienceConfig {
        ResilienceConfig {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tts = ResilientLLM::new(
            Box::new(Flaky {
                calls: calls.clone(),
                failures: 2,
                error: || LLMError::HttpError("connection reset".into()),
            }),
            fast(),
        );
        assert_eq!(tts.speech("x").await.unwrap(), vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn auth_errors_are_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tts = ResilientLLM::new(
            Box::new(Flaky {
                calls: calls.clone(),
                failures: 5,
                error: || LLMError::AuthError("bad key".into()),
            }),
            fast(),
        );
        assert!(matches!(tts.speech("x").await, Err(LLMError::AuthError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tts = ResilientLLM::new(
            Box::new(Flaky {
                calls: calls.clone(),
                failures: 10,
                error: || LLMError::RateLimited("slow down".into()),
            }),
            fast(),
        );
        match tts.speech("x").await {
            Err(LLMError::RetryExceeded {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("slow down"));
            }
            other => panic!("expected RetryExceeded, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    struct Unreachable(Arc<AtomicUsize>);

    #[async_trait]
    impl ChatProvider for Unreachable {
        async fn chat(&self, _: &[ChatMessage]) -> Result<Box<dyn ChatResponse>, LLMError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(LLMError::HttpError("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn chat_reports_exhausted_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chat = ResilientLLM::new(
            Box::new(Unreachable(calls.clone())),
            ResilienceConfig {
                max_attempts: 2,
                ..fast()
            },
        );
        let err = chat.chat(&[]).await.unwrap_err();
        assert!(matches!(err, LLMError::RetryExceeded { attempts: 2, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn backoff_is_capped() {
        let tts: ResilientLLM<dyn TextToSpeechProvider> = ResilientLLM::new(
            Box::new(Flaky {
                calls: Arc::new(AtomicUsize::new(0)),
                failures: 0,
                error: || LLMError::HttpError(String::new()),
            }),
            ResilienceConfig {
                jitter: false,
                ..ResilienceConfig::defaults()
            },
        );
        assert_eq!(tts.backoff_delay(0), Duration::from_millis(200));
        assert_eq!(tts.backoff_delay(1), Duration::from_millis(400));
        assert_eq!(tts.backoff_delay(10), Duration::from_millis(2_000));
    }
}
