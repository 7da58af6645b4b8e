use std::sync::Arc;

use promptopt_core::{
    AggregateStats, EpicDistResult, Epic, FormalityLevel, GenerateResult, JudgeOutput,
    PromptDistReport, ScoredGenerateResult, StoryPack,
};
use promptopt_llm::LlmClient;
use tokio::sync::Semaphore;

use crate::assurance_aggregator::aggregate as aggregate_assurance;
use crate::generator::GeneratorClient;
use crate::heuristic::score_heuristics;
use crate::judge_panel::{self, DEFAULT_JUDGE_TEMPERATURES};

#[derive(Debug, Clone, Copy)]
pub struct DistributionalEvaluatorConfig {
    pub replicates: usize,
    pub seed_base: i64,
    pub discoverability_tries: u32,
    pub std_lambda: f64,
    pub fail_penalty: f64,
    pub max_tokens: u32,
}

impl Default for DistributionalEvaluatorConfig {
    fn default() -> Self {
        Self {
            replicates: 5,
            seed_base: 1,
            discoverability_tries: 3,
            std_lambda: 0.10,
            fail_penalty: 0.20,
            max_tokens: 1_024,
        }
    }
}

pub struct DistributionalEvaluator {
    generator: Arc<GeneratorClient>,
    llm: Arc<dyn LlmClient>,
    model: String,
    semaphore: Arc<Semaphore>,
    config: DistributionalEvaluatorConfig,
}

impl DistributionalEvaluator {
    pub fn new(
        generator: Arc<GeneratorClient>,
        semaphore: Arc<Semaphore>,
        config: DistributionalEvaluatorConfig,
    ) -> Self {
        let llm = generator.llm();
        let model = generator.model().to_string();
        Self {
            generator,
            llm,
            model,
            semaphore,
            config,
        }
    }

    /// `evaluate(promptText, epics, replicates, seedBase, concurrency) ->
    /// PromptDistReport`. Epics are reported in input order; within an
    /// epic, replicates are gathered and then sorted by seed before
    /// statistics are computed.
    pub async fn evaluate(&self, prompt_id: &str, prompt_text: &str, epics: &[Epic]) -> PromptDistReport {
        let mut per_epic = Vec::with_capacity(epics.len());
        let mut total_runs = 0usize;
        let mut total_errors = 0usize;

        for epic in epics {
            let dist = self.evaluate_epic(prompt_text, epic).await;
            total_runs += dist.runs.len();
            total_errors += dist
                .runs
                .iter()
                .filter(|r| !r.result.is_valid())
                .count();
            per_epic.push(dist);
        }

        let agg = aggregate_stats(&per_epic, self.config.std_lambda, self.config.fail_penalty);
        let inconclusive = total_runs > 0 && total_errors * 2 >= total_runs;

        PromptDistReport {
            prompt_id: prompt_id.to_string(),
            per_epic,
            agg,
            inconclusive,
        }
    }

    async fn evaluate_epic(&self, prompt_text: &str, epic: &Epic) -> EpicDistResult {
        let mut handles = Vec::with_capacity(self.config.replicates);
        for i in 0..self.config.replicates {
            let seed = self.config.seed_base + i as i64;
            let generator = self.generator.clone();
            let semaphore = self.semaphore.clone();
            let llm = self.llm.clone();
            let model = self.model.clone();
            let prompt_text = prompt_text.to_string();
            let epic = epic.clone();
            let max_tokens = self.config.max_tokens;
            handles.push(tokio::spawn(async move {
                let result = {
                    let _permit = semaphore.acquire().await;
                    generator.generate(&epic, &prompt_text, seed, max_tokens).await
                };
                let judges = match &result.story_pack {
                    Some(story_pack) => {
                        let prompt = judge_prompt(&epic, story_pack);
                        judge_panel::run_panel(
                            llm,
                            semaphore,
                            &model,
                            |_temperature| prompt.clone(),
                            &DEFAULT_JUDGE_TEMPERATURES,
                        )
                        .await
                        .unwrap_or_default()
                    }
                    None => Vec::new(),
                };
                (result, judges)
            }));
        }

        let mut runs = Vec::with_capacity(self.config.replicates);
        for handle in handles {
            let (result, judges) = handle.await.unwrap_or_else(|_| {
                (GenerateResult::failed(0, String::new(), "generator task panicked"), Vec::new())
            });
            let heuristics = score_heuristics(epic, result.story_pack.as_ref(), &judges);
            let assurance = (judges.len() >= 2).then(|| {
                let formalities: Vec<FormalityLevel> =
                    judges.iter().map(JudgeOutput::formality_level).collect();
                aggregate_assurance(&judges, &formalities)
            });
            runs.push(ScoredGenerateResult {
                result,
                score: heuristics.overall,
                assurance,
            });
        }
        runs.sort_by_key(|r| r.result.seed);

        epic_statistics(epic.id.clone(), runs, self.config.discoverability_tries)
    }
}

/// Builds the judge request for one generated story pack: the epic context,
/// the extracted story text, and the fixed rubric of criteria the panel
/// grades against.
fn judge_prompt(epic: &Epic, story_pack: &StoryPack) -> String {
    format!(
        "Epic: {}\nDescription: {}\n\nStory pack:\n{}\n\n\
        Grade this story pack against each of: independent, negotiable, valuable, \
        estimable, small, testable, gwt_format, schema_valid, correctness, completeness, safety. \
        Respond as JSON: {{\"perCriterion\": {{\"<criterion>\": {{\"score\": <0..1>, \"rationale\": \"...\"}}}}}}",
        epic.title,
        epic.description,
        story_pack.extract_text(),
    )
}

fn epic_statistics(epic_id: String, runs: Vec<ScoredGenerateResult>, k_tries: u32) -> EpicDistResult {
    let n = runs.len();
    let scores: Vec<f64> = runs.iter().map(|r| r.score).collect();
    let mean_score = mean(&scores);
    let p10_score = percentile_nearest_rank(&scores, 10.0);
    let std_score = population_std(&scores, mean_score);
    let pass_count = runs.iter().filter(|r| r.result.is_valid()).count();
    let pass_rate = if n == 0 { 0.0 } else { pass_count as f64 / n as f64 };
    let discoverability_k = 1.0 - (1.0 - pass_rate).powi(k_tries as i32);

    EpicDistResult {
        epic_id,
        runs,
        mean_score,
        p10_score,
        std_score,
        pass_rate,
        discoverability_k,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn population_std(values: &[f64], mean_value: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// 10th percentile over `values` by the nearest-rank method.
fn percentile_nearest_rank(values: &[f64], percentile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let rank = ((percentile / 100.0) * sorted.len() as f64).ceil() as usize;
    let index = rank.clamp(1, sorted.len()) - 1;
    sorted[index]
}

fn aggregate_stats(per_epic: &[EpicDistResult], std_lambda: f64, fail_penalty: f64) -> AggregateStats {
    if per_epic.is_empty() {
        return AggregateStats::default();
    }
    let n = per_epic.len() as f64;
    let mean_of_means = per_epic.iter().map(|e| e.mean_score).sum::<f64>() / n;
    let mean_pass_rate = per_epic.iter().map(|e| e.pass_rate).sum::<f64>() / n;
    let mean_p10 = per_epic.iter().map(|e| e.p10_score).sum::<f64>() / n;
    let mean_std = per_epic.iter().map(|e| e.std_score).sum::<f64>() / n;

    let objective = (0.45 * mean_pass_rate + 0.35 * mean_of_means + 0.20 * mean_p10
        - std_lambda * mean_std
        - fail_penalty * (1.0 - mean_pass_rate))
        .clamp(0.0, 1.0);

    AggregateStats {
        mean_of_means,
        mean_pass_rate,
        mean_p10,
        mean_std,
        objective,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(seed: i64, score: f64, valid: bool) -> ScoredGenerateResult {
        let result = if valid {
            GenerateResult::ok(
                seed,
                promptopt_core::StoryPack {
                    epic_id: "E".to_string(),
                    epic_title: "E".to_string(),
                    user_stories: vec![],
                    assumptions: vec![],
                    risks: vec![],
                    follow_ups: vec![],
                },
                String::new(),
                None,
            )
        } else {
            GenerateResult::failed(seed, String::new(), "invalid")
        };
        ScoredGenerateResult {
            result,
            score,
            assurance: None,
        }
    }

    #[test]
    fn functional_scenario_1_evaluator_statistics() {
        let epic_a = epic_statistics(
            "a".to_string(),
            vec![run(1, 0.9, true), run(2, 0.9, true), run(3, 0.9, true)],
            3,
        );
        let epic_b = epic_statistics(
            "b".to_string(),
            vec![run(1, 0.8, true), run(2, 0.2, true), run(3, 0.8, true)],
            3,
        );
        let epic_c = epic_statistics(
            "c".to_string(),
            vec![run(1, 0.0, false), run(2, 0.0, false), run(3, 0.0, false)],
            3,
        );

        let agg = aggregate_stats(&[epic_a, epic_b, epic_c], 0.10, 0.20);
        assert!((agg.mean_pass_rate - (2.0 / 3.0)).abs() < 1e-9);
        assert!((agg.mean_of_means - 0.5).abs() < 1e-9);
        assert!((agg.mean_p10 - 0.367).abs() < 1e-2);
    }

    #[test]
    fn unit_percentile_nearest_rank_matches_known_values() {
        let values = vec![0.9, 0.2, 0.8];
        assert!((percentile_nearest_rank(&values, 10.0) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn unit_objective_ordering_is_identical_for_identical_substatistics() {
        let a = AggregateStats {
            mean_of_means: 0.6,
            mean_pass_rate: 0.8,
            mean_p10: 0.4,
            mean_std: 0.1,
            objective: 0.0,
        };
        let obj_a = (0.45 * a.mean_pass_rate + 0.35 * a.mean_of_means + 0.20 * a.mean_p10
            - 0.10 * a.mean_std
            - 0.20 * (1.0 - a.mean_pass_rate))
            .clamp(0.0, 1.0);
        let obj_b = (0.45 * a.mean_pass_rate + 0.35 * a.mean_of_means + 0.20 * a.mean_p10
            - 0.10 * a.mean_std
            - 0.20 * (1.0 - a.mean_pass_rate))
            .clamp(0.0, 1.0);
        assert_eq!(obj_a, obj_b);
    }
}
