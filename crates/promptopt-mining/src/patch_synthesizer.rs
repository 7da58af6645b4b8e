use std::sync::Arc;

use promptopt_core::ContrastPair;
use promptopt_llm::{ChatRequest, LlmClient, LlmError, Message};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct PatchSynthesizerConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_pairs_in_context: usize,
}

impl Default for PatchSynthesizerConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 1_024,
            max_pairs_in_context: 8,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPatchCandidate {
    patch: String,
    rationale: String,
    #[serde(rename = "targetedIssue")]
    targeted_issue: String,
}

#[derive(Debug, Deserialize)]
struct RawSynthesisResponse {
    candidates: Vec<RawPatchCandidate>,
}

const SYSTEM_PROMPT: &str = "You rewrite prompt-engineering rules. Given a base prompt, its \
current patch, and contrastive pairs of good-vs-bad outputs for the same input, propose \
distinct textual rules that would push bad outcomes toward good outcomes. Respond as JSON: \
{\"candidates\": [{\"patch\": ..., \"rationale\": ..., \"targetedIssue\": ...}]}.";

fn render_pairs(pairs: &[ContrastPair], limit: usize) -> serde_json::Value {
    json!(pairs
        .iter()
        .take(limit)
        .map(|pair| {
            json!({
                "epicId": pair.epic_id,
                "good": { "score": pair.good.score, "text": pair.good.result.raw_text },
                "bad": { "score": pair.bad.score, "text": pair.bad.result.raw_text },
                "similarity": pair.similarity,
                "scoreDelta": pair.score_delta,
                "errorAnalysis": pair.error_analysis,
            })
        })
        .collect::<Vec<_>>())
}

/// `synthesize(basePrompt, currentPatch, pairs, count) -> candidates`.
/// Malformed candidates are discarded; the result length is `[0, count]`.
pub async fn synthesize(
    llm: Arc<dyn LlmClient>,
    config: &PatchSynthesizerConfig,
    base_prompt: &str,
    current_patch: &str,
    pairs: &[ContrastPair],
    count: usize,
) -> Result<Vec<promptopt_core::PatchCandidate>, LlmError> {
    let context = json!({
        "basePrompt": base_prompt,
        "currentPatch": current_patch,
        "pairs": render_pairs(pairs, config.max_pairs_in_context),
        "requestedCandidateCount": count,
    });

    let mut request = ChatRequest::new(
        config.model.clone(),
        vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(context.to_string()),
        ],
    );
    request.temperature = Some(config.temperature);
    request.max_tokens = Some(config.max_tokens);
    request.json_mode = true;

    let response = llm.complete(request).await?;
    let parsed: RawSynthesisResponse = match serde_json::from_str(&response.text) {
        Ok(parsed) => parsed,
        Err(_) => return Ok(Vec::new()),
    };

    let candidates = parsed
        .candidates
        .into_iter()
        .take(count)
        .enumerate()
        .map(|(idx, raw)| promptopt_core::PatchCandidate {
            id: format!("patch-{idx}"),
            patch: raw.patch,
            rationale: raw.rationale,
            targeted_issue: raw.targeted_issue,
        })
        .collect();

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[tokio::test]
    async fn unit_synthesize_discards_malformed_response() {
        let llm: Arc<dyn LlmClient> = Arc::new(promptopt_llm::FixtureLlmClient::new(HashMap::new()));
        let config = PatchSynthesizerConfig::default();
        let candidates = synthesize(llm, &config, "base", "patch", &[], 3).await.expect("ok");
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn unit_synthesize_parses_well_formed_response() {
        let mut responses = HashMap::new();
        responses.insert(
            ("gpt-4o-mini".to_string(), 0),
            r#"{"candidates":[{"patch":"Always include a testable Given/When/Then.","rationale":"r","targetedIssue":"gwt_format"}]}"#
                .to_string(),
        );
        let llm: Arc<dyn LlmClient> = Arc::new(promptopt_llm::FixtureLlmClient::new(responses));
        let config = PatchSynthesizerConfig::default();
        let candidates = synthesize(llm, &config, "base", "patch", &[], 3).await.expect("ok");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].targeted_issue, "gwt_format");
    }
}
