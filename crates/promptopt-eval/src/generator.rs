use std::sync::Arc;

use promptopt_core::Epic;
use promptopt_llm::{ChatRequest, LlmClient, LlmError, Message};

use crate::schema::parse_story_pack;

/// `generate(epic, promptText, seed, maxTokens) -> GenerateResult`: submits
/// a single request to the external LLM and never retries internally.
pub struct GeneratorClient {
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl GeneratorClient {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// The underlying LLM collaborator, shared with callers (the judge
    /// panel) that need to issue requests against the same model.
    pub fn llm(&self) -> Arc<dyn LlmClient> {
        self.llm.clone()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate(
        &self,
        epic: &Epic,
        prompt_text: &str,
        seed: i64,
        max_tokens: u32,
    ) -> promptopt_core::GenerateResult {
        let mut request = ChatRequest::new(
            self.model.clone(),
            vec![
                Message::system(prompt_text),
                Message::user(format!(
                    "Epic: {}\nDescription: {}",
                    epic.title, epic.description
                )),
            ],
        );
        request.seed = Some(seed);
        request.max_tokens = Some(max_tokens);
        request.json_mode = true;

        match self.llm.complete(request).await {
            Ok(response) => self.to_generate_result(epic, seed, response.text),
            Err(LlmError::Timeout(ms)) => promptopt_core::GenerateResult::failed(
                seed,
                String::new(),
                format!("timeout after {ms}ms"),
            ),
            Err(error) => {
                promptopt_core::GenerateResult::failed(seed, String::new(), error.to_string())
            }
        }
    }

    fn to_generate_result(
        &self,
        epic: &Epic,
        seed: i64,
        raw_text: String,
    ) -> promptopt_core::GenerateResult {
        match parse_story_pack(&raw_text, epic) {
            Ok(story_pack) => {
                promptopt_core::GenerateResult::ok(seed, story_pack, raw_text, None)
            }
            Err(error) => promptopt_core::GenerateResult::failed(seed, raw_text, error.to_string()),
        }
    }
}
