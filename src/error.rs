use std::fmt;

/// Error types that can occur when talking to a chat-completion or speech backend.
#[derive(Debug)]
pub enum LLMError {
    /// HTTP request/response errors
    HttpError(String),
    /// Authentication and authorization errors
    AuthError(String),
    /// Invalid request parameters or format
    InvalidRequest(String),
    /// Errors returned by the provider
    ProviderError(String),
    /// The provider refused the request because of rate limiting
    RateLimited(String),
    /// API returned an unexpected body
    ResponseFormatError {
        message: String,
        raw_response: String,
    },
    /// JSON serialization/deserialization errors
    JsonError(String),
    /// Retries were exhausted
    RetryExceeded { attempts: usize, last_error: String },
}

impl fmt::Display for LLMError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LLMError::HttpError(e) => write!(f, "HTTP Error: {}", e),
            LLMError::AuthError(e) => write!(f, "Auth Error: {}", e),
            LLMError::InvalidRequest(e) => write!(f, "Invalid Request: {}", e),
            LLMError::ProviderError(e) => write!(f, "Provider Error: {}", e),
            LLMError::RateLimited(e) => write!(f, "Rate Limited: {}", e),
            LLMError::ResponseFormatError {
                message,
                raw_response,
            } => write!(
                f,
                "Response Format Error: {}. Raw response: {}",
                message, raw_response
            ),
            LLMError::JsonError(e) => write!(f, "JSON Parse Error: {}", e),
            LLMError::RetryExceeded {
                attempts,
                last_error,
            } => write!(
                f,
                "Retry Exceeded after {} attempts: {}",
                attempts, last_error
            ),
        }
    }
}

impl std::error::Error for LLMError {}

/// Converts reqwest HTTP errors into LLMErrors
impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        LLMError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for LLMError {
    fn from(err: serde_json::Error) -> Self {
        LLMError::JsonError(format!(
            "{} at line {} column {}",
            err,
            err.line(),
            err.column()
        ))
    }
}

/// Failures of the response generator, as seen by the service.
#[derive(Debug)]
pub enum ResponderError {
    /// Missing credential, missing prompt file or a disabled backend. Fatal at startup.
    Configuration(String),
    /// The chat completion could not be obtained. Synthesis was not attempted.
    Provider(LLMError),
    /// Speech synthesis failed after a reply text had been generated.
    Synthesis {
        text_response: String,
        source: LLMError,
    },
}

impl ResponderError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

impl fmt::Display for ResponderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponderError::Configuration(e) => write!(f, "Configuration error: {}", e),
            ResponderError::Provider(e) => write!(f, "Chat completion failed: {}", e),
            ResponderError::Synthesis { source, .. } => {
                write!(f, "Speech synthesis failed: {}", source)
            }
        }
    }
}

impl std::error::Error for ResponderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResponderError::Configuration(_) => None,
            ResponderError::Provider(e) => Some(e),
            ResponderError::Synthesis { source, .. } => Some(source),
        }
    }
}
