use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::types::{ChatRequest, ChatResponse, ChatUsage, LlmClient, LlmError};

/// Replays a fixed transcript keyed by `(model, seed)` instead of calling a
/// live endpoint. The LLM is treated as a pure function of its request, so a
/// recorded transcript is enough to drive deterministic tests of every
/// downstream component.
pub struct FixtureLlmClient {
    responses: HashMap<(String, i64), String>,
    calls: Mutex<Vec<ChatRequest>>,
}

impl FixtureLlmClient {
    pub fn new(responses: HashMap<(String, i64), String>) -> Self {
        Self {
            responses,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().expect("fixture lock poisoned").clone()
    }
}

#[async_trait]
impl LlmClient for FixtureLlmClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let key = (request.model.clone(), request.seed.unwrap_or(0));
        self.calls
            .lock()
            .expect("fixture lock poisoned")
            .push(request);
        let text = self
            .responses
            .get(&key)
            .cloned()
            .ok_or_else(|| LlmError::InvalidResponse(format!("no fixture for {key:?}")))?;
        Ok(ChatResponse {
            text,
            finish_reason: Some("stop".to_string()),
            usage: ChatUsage::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    #[tokio::test]
    async fn unit_fixture_client_replays_response_for_matching_seed() {
        let mut responses = HashMap::new();
        responses.insert(("gpt-4o-mini".to_string(), 7), "hello world".to_string());
        let client = FixtureLlmClient::new(responses);

        let request = ChatRequest {
            seed: Some(7),
            ..ChatRequest::new("gpt-4o-mini", vec![Message::user("hi")])
        };
        let response = client.complete(request).await.expect("fixture hit");
        assert_eq!(response.text, "hello world");
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn unit_fixture_client_errors_on_unrecorded_seed() {
        let client = FixtureLlmClient::new(HashMap::new());
        let request = ChatRequest::new("gpt-4o-mini", vec![Message::user("hi")]);
        let error = client.complete(request).await.expect_err("no fixture");
        assert!(matches!(error, LlmError::InvalidResponse(_)));
    }
}
