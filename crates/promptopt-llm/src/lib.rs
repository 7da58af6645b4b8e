//! Minimal client for the LLM collaborator: an OpenAI-compatible
//! chat-completions endpoint treated as a stateless `(request, seed) -> text`
//! function. A single HTTP attempt per call; retry and backoff policy live
//! in [`retry`] as pure functions the caller drives.

mod fixture;
mod openai;
mod retry;
mod types;

pub use fixture::FixtureLlmClient;
pub use openai::{OpenAiCompatibleClient, OpenAiConfig};
pub use retry::{
    is_retryable_http_error, new_request_id, next_backoff_ms, next_backoff_ms_with_jitter,
    parse_retry_after_ms, provider_retry_delay_ms, retry_budget_allows_delay, should_retry_status,
};
pub use types::{ChatRequest, ChatResponse, ChatUsage, LlmClient, LlmError, Message, MessageRole};
