use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::retry::{new_request_id, should_retry_status};
use crate::types::{ChatRequest, ChatResponse, ChatUsage, LlmClient, LlmError, Message, MessageRole};

#[derive(Debug, Clone)]
/// Connection settings for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiConfig {
    pub api_base: String,
    pub api_key: String,
    pub request_timeout_ms: u64,
}

impl OpenAiConfig {
    pub fn from_env() -> Result<Self, LlmError> {
        let api_base = std::env::var("LLM_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("LLM_API_KEY").map_err(|_| LlmError::MissingApiKey)?;
        let request_timeout_ms = std::env::var("LLM_TIMEOUT_MS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(120_000);
        Ok(Self {
            api_base,
            api_key,
            request_timeout_ms,
        })
    }
}

#[derive(Debug, Clone)]
/// A single-attempt client against an OpenAI-compatible chat-completions endpoint.
///
/// Performs exactly one HTTP request per `complete` call; backoff and retry
/// are the caller's concern, driven by the pure helpers in [`crate::retry`].
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiCompatibleClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = format!("Bearer {}", config.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer)
                .map_err(|e| LlmError::InvalidResponse(format!("invalid API key header: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()
            .map_err(LlmError::Transport)?;

        Ok(Self { client, config })
    }

    fn chat_completions_url(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            return base.to_string();
        }
        format!("{base}/chat/completions")
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let body = build_request_body(&request);
        let request_id = new_request_id();

        let response = self
            .client
            .post(self.chat_completions_url())
            .header("x-promptopt-request-id", request_id)
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    LlmError::Timeout(self.config.request_timeout_ms)
                } else {
                    LlmError::Transport(error)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retryable = should_retry_status(status.as_u16());
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status: status.as_u16(),
                body,
                retryable,
            });
        }

        let raw = response.text().await.map_err(LlmError::Transport)?;
        parse_chat_response(&raw)
    }
}

fn build_request_body(request: &ChatRequest) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|message| {
            let role = match message.role {
                MessageRole::System => "system",
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            };
            json!({ "role": role, "content": message.content })
        })
        .collect();

    let mut body = json!({
        "model": request.model,
        "messages": messages,
    });

    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(seed) = request.seed {
        body["seed"] = json!(seed);
    }
    if request.json_mode {
        body["response_format"] = json!({ "type": "json_object" });
    }

    body
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ChatCompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

fn parse_chat_response(raw: &str) -> Result<ChatResponse, LlmError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(raw)
        .map_err(|error| LlmError::InvalidResponse(format!("malformed response body: {error}")))?;
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("response had no choices".to_string()))?;
    let text = choice.message.content.unwrap_or_default();
    let usage = parsed
        .usage
        .map(|usage| ChatUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        })
        .unwrap_or_default();

    Ok(ChatResponse {
        text,
        finish_reason: choice.finish_reason,
        usage,
    })
}
