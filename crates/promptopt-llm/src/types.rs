use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Role of a single message in a chat transcript.
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A single turn in a chat-completions transcript.
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: text.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Request envelope for a single OpenAI-compatible chat-completions call.
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Decoding seed, forwarded when the provider supports deterministic sampling.
    pub seed: Option<i64>,
    /// Hints the provider to constrain output to a JSON object.
    #[serde(default)]
    pub json_mode: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            seed: None,
            json_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
/// Token accounting reported back by the provider, when available.
pub struct ChatUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Terminal, aggregated response to a chat-completions call.
///
/// The core only ever requires the terminal text; streaming is not part of
/// this surface.
pub struct ChatResponse {
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: ChatUsage,
}

#[derive(Debug, Error)]
/// Error taxonomy surfaced by an [`LlmClient`] implementation.
///
/// `Timeout` and `Transport`/`HttpStatus` are transport-level failures;
/// schema-validation failures are raised by callers parsing
/// `ChatResponse::text`, not by the client itself.
pub enum LlmError {
    #[error("missing API key")]
    MissingApiKey,
    #[error("request timed out after {0}ms")]
    Timeout(u64),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus {
        status: u16,
        body: String,
        retryable: bool,
    },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Whether the caller may reasonably retry this call (outside the core,
    /// per the spec's "retry handled by the caller, not inside the core").
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Timeout(_) => true,
            LlmError::Transport(error) => {
                error.is_timeout() || error.is_connect() || error.is_request()
            }
            LlmError::HttpStatus { retryable, .. } => *retryable,
            LlmError::MissingApiKey | LlmError::InvalidResponse(_) => false,
        }
    }
}

#[async_trait]
/// A stateless request/response collaborator around an LLM endpoint.
///
/// Implementations must not retry internally: retry policy belongs to the
/// caller so that the global concurrency bound and per-call timeout stay the
/// only backpressure mechanism.
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification_matches_status_family() {
        let retryable = LlmError::HttpStatus {
            status: 429,
            body: String::new(),
            retryable: true,
        };
        let fatal = LlmError::HttpStatus {
            status: 401,
            body: String::new(),
            retryable: false,
        };
        assert!(retryable.is_retryable());
        assert!(!fatal.is_retryable());
        assert!(LlmError::Timeout(1_000).is_retryable());
        assert!(!LlmError::MissingApiKey.is_retryable());
    }
}
