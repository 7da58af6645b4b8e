use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use promptopt_core::{max_pairwise_delta, CongruenceLevel, Criterion, EngineError, JudgeOutput};
use promptopt_llm::{ChatRequest, LlmClient, Message};
use serde::Deserialize;
use tokio::sync::Semaphore;

/// Default diversity-inducing sampling temperatures for the three default
/// judges.
pub const DEFAULT_JUDGE_TEMPERATURES: [f32; 3] = [0.3, 0.5, 0.7];

#[derive(Debug, Deserialize)]
struct RawJudgeResponse {
    #[serde(rename = "perCriterion")]
    per_criterion: BTreeMap<String, RawCriterionScore>,
}

#[derive(Debug, Deserialize)]
struct RawCriterionScore {
    score: f64,
    #[serde(default)]
    rationale: String,
}

fn criterion_from_key(key: &str) -> Option<Criterion> {
    match key {
        "independent" => Some(Criterion::Independent),
        "negotiable" => Some(Criterion::Negotiable),
        "valuable" => Some(Criterion::Valuable),
        "estimable" => Some(Criterion::Estimable),
        "small" => Some(Criterion::Small),
        "testable" => Some(Criterion::Testable),
        "gwt_format" => Some(Criterion::GwtFormat),
        "schema_valid" => Some(Criterion::SchemaValid),
        "correctness" => Some(Criterion::Correctness),
        "completeness" => Some(Criterion::Completeness),
        "safety" => Some(Criterion::Safety),
        _ => None,
    }
}

async fn run_one_judge(
    llm: &Arc<dyn LlmClient>,
    semaphore: &Semaphore,
    model: &str,
    judge_id: String,
    prompt: String,
    temperature: f32,
) -> Result<JudgeOutput, EngineError> {
    let _permit = semaphore
        .acquire()
        .await
        .map_err(|_| EngineError::Cancellation)?;

    let started = std::time::Instant::now();
    let mut request = ChatRequest::new(model.to_string(), vec![Message::user(prompt)]);
    request.temperature = Some(temperature);
    request.json_mode = true;

    let response = llm
        .complete(request)
        .await
        .map_err(|error| EngineError::Transport(error.to_string()))?;
    let latency_ms = started.elapsed().as_millis() as u64;

    let raw: RawJudgeResponse = serde_json::from_str(&response.text)
        .map_err(|error| EngineError::Validation(error.to_string()))?;

    let mut per_criterion = BTreeMap::new();
    for (key, value) in raw.per_criterion {
        if let Some(criterion) = criterion_from_key(&key) {
            per_criterion.insert(criterion, (value.score.clamp(0.0, 1.0), value.rationale));
        }
    }

    let overall_score = per_criterion
        .iter()
        .map(|(criterion, (score, _))| criterion.weight() * score)
        .sum();

    Ok(JudgeOutput {
        judge_id,
        per_criterion,
        overall_score,
        latency_ms,
        timestamp: Utc::now().timestamp(),
    })
}

/// Runs K diverse judges in parallel over the global concurrency semaphore.
/// Fails with [`EngineError::Panel`] only if every judge fails; otherwise
/// proceeds with survivors (congruence requires `>= 2`).
pub async fn run_panel(
    llm: Arc<dyn LlmClient>,
    semaphore: Arc<Semaphore>,
    model: &str,
    prompt_builder: impl Fn(f32) -> String,
    temperatures: &[f32],
) -> Result<Vec<JudgeOutput>, EngineError> {
    let mut handles = Vec::new();
    for (idx, temperature) in temperatures.iter().enumerate() {
        let llm = llm.clone();
        let semaphore = semaphore.clone();
        let model = model.to_string();
        let judge_id = format!("judge-{idx}");
        let prompt = prompt_builder(*temperature);
        let temperature = *temperature;
        handles.push(tokio::spawn(async move {
            run_one_judge(&llm, &semaphore, &model, judge_id, prompt, temperature).await
        }));
    }

    let mut survivors = Vec::new();
    for handle in handles {
        if let Ok(Ok(output)) = handle.await {
            survivors.push(output);
        }
    }

    if survivors.is_empty() {
        return Err(EngineError::Panel("every judge failed".to_string()));
    }
    Ok(survivors)
}

/// `delta = max(overallScores) - min(overallScores)`, mapped to a
/// [`CongruenceLevel`] by the fixed thresholds.
pub fn congruence(outputs: &[JudgeOutput]) -> CongruenceLevel {
    let scores: Vec<f64> = outputs.iter().map(|o| o.overall_score).collect();
    CongruenceLevel::from_delta(max_pairwise_delta(&scores))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[tokio::test]
    async fn unit_run_panel_fails_when_every_judge_fails() {
        let llm: Arc<dyn LlmClient> = Arc::new(promptopt_llm::FixtureLlmClient::new(HashMap::new()));
        let semaphore = Arc::new(Semaphore::new(4));
        let result = run_panel(
            llm,
            semaphore,
            "gpt-4o-mini",
            |_| "judge this".to_string(),
            &DEFAULT_JUDGE_TEMPERATURES,
        )
        .await;
        assert!(matches!(result, Err(EngineError::Panel(_))));
    }

    #[test]
    fn unit_congruence_matches_scenario_2_thresholds() {
        let make = |id: &str, score: f64| JudgeOutput {
            judge_id: id.to_string(),
            per_criterion: BTreeMap::new(),
            overall_score: score,
            latency_ms: 0,
            timestamp: 0,
        };
        let outputs = vec![make("a", 0.95), make("b", 0.50), make("c", 0.70)];
        assert_eq!(congruence(&outputs), CongruenceLevel::WeakGuess);
    }
}
