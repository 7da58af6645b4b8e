use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use promptopt_core::{
    Champion, Epic, MutationKind, MutationPrompt, OptimizationProgress, OptimizationResult,
    OptimizationStep, TaskPrompt,
};
use promptopt_eval::{generator::GeneratorClient, DistributionalEvaluator, DistributionalEvaluatorConfig};
use promptopt_evolve::{MetaEvolutionConfig, MetaEvolutionEngine};
use promptopt_llm::LlmClient;
use promptopt_mining::{mine_pairs, patch_synthesizer, PairMinerConfig};
use promptopt_select::{nqd_select, tournament, NqdSelectorConfig, TournamentProgress};
use rand::SeedableRng;
use tokio::sync::Semaphore;
use tracing::info;

use crate::telemetry::TelemetrySink;

/// Cooperative cancellation flag shared between the caller and an
/// in-progress loop; checked between steps, never mid-step.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub max_iterations: u64,
    pub concurrency: usize,
    pub eval: DistributionalEvaluatorConfig,
    pub pair_miner: PairMinerConfig,
    pub synthesizer: patch_synthesizer::PatchSynthesizerConfig,
    pub nqd: NqdSelectorConfig,
    pub nqd_enabled: bool,
    pub meta: MetaEvolutionConfig,
    pub meta_enabled: bool,
    pub promote_epsilon: f64,
    pub candidates_per_iteration: usize,
}

const SEEDED_MUTATION_KINDS: [MutationKind; 4] = [
    MutationKind::Direct,
    MutationKind::Eda,
    MutationKind::Lamarckian,
    MutationKind::ZeroOrderHyper,
];

fn seeded_mutation_text(kind: MutationKind) -> &'static str {
    match kind {
        MutationKind::Direct => "Rewrite the patch directly to fix the targeted issue.",
        MutationKind::Eda => "Propose a patch in the style of the strongest exemplar.",
        MutationKind::Lamarckian => "Fold the contrastive pair's lesson back into the patch text.",
        MutationKind::ZeroOrderHyper => "Generate a patch without conditioning on the parent's text.",
        MutationKind::Hypermutation | MutationKind::Crossover => {
            "Combine or rewrite existing mutation instructions."
        }
    }
}

/// Drives one optimization run through its canonical iteration: evaluate the
/// champion, mine contrastive pairs, synthesize candidate patches, run the
/// champion/challenger tournament, apply the promotion decision, co-evolve
/// the task/mutation populations, and checkpoint the champion to disk.
pub struct LoopOrchestrator {
    llm: Arc<dyn LlmClient>,
    model: String,
    evaluator: Arc<DistributionalEvaluator>,
    telemetry: Arc<TelemetrySink>,
    config: LoopConfig,
}

impl LoopOrchestrator {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, telemetry: Arc<TelemetrySink>, config: LoopConfig) -> Self {
        let model = model.into();
        let generator = Arc::new(GeneratorClient::new(llm.clone(), model.clone()));
        let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
        let evaluator = Arc::new(DistributionalEvaluator::new(generator, semaphore, config.eval));
        Self {
            llm,
            model,
            evaluator,
            telemetry,
            config,
        }
    }

    /// Runs the loop in place over `champion` until `max_iterations`,
    /// cancellation, or an unrecoverable error; reports progress through
    /// `on_progress` after every step.
    pub async fn run(
        &self,
        champion: &mut Champion,
        epics: &[Epic],
        cancellation: &CancellationToken,
        mut on_progress: impl FnMut(OptimizationProgress),
        mut checkpoint: impl FnMut(&Champion) -> anyhow::Result<()>,
    ) -> OptimizationResult {
        let mut promotions = 0u64;
        let mut final_objective = 0.0;
        let mut iterations_completed = 0u64;
        let mut terminal_reason = "max_iterations".to_string();

        let mut task_population: Vec<TaskPrompt> = (0..self.config.meta.task_population_size.max(1))
            .map(|i| TaskPrompt {
                id: format!("seed-{i}"),
                base: champion.base.clone(),
                patch: champion.patch.clone(),
                fitness: 0.0,
                generation: 0,
                mutation_id: None,
                parent_id: None,
            })
            .collect();
        let mut mutation_population: Vec<MutationPrompt> = SEEDED_MUTATION_KINDS
            .into_iter()
            .enumerate()
            .map(|(i, kind)| MutationPrompt {
                id: format!("seed-mutation-{i}"),
                text: seeded_mutation_text(kind).to_string(),
                kind,
                fitness: 0.0,
                usage_count: 0,
                success_rate: 0.0,
                generation: 0,
                parent_id: None,
            })
            .collect();
        let mut meta_engine = MetaEvolutionEngine::new(self.llm.clone(), self.model.clone(), self.config.meta.clone());
        let mut rng = rand::rngs::StdRng::from_entropy();
        let mut consecutive_outages = 0u32;

        for iteration in 0..self.config.max_iterations {
            if cancellation.is_cancelled() {
                terminal_reason = "cancelled".to_string();
                break;
            }

            on_progress(OptimizationProgress {
                iteration,
                max_iterations: self.config.max_iterations,
                step: OptimizationStep::EvaluateChampion,
            });
            let report = self.evaluator.evaluate("champion", &champion.composed, epics).await;
            final_objective = report.agg.objective;

            if report.inconclusive {
                consecutive_outages += 1;
                if consecutive_outages >= 2 {
                    terminal_reason = "evaluator_outage".to_string();
                    break;
                }
            } else {
                consecutive_outages = 0;
            }

            if cancellation.is_cancelled() {
                terminal_reason = "cancelled".to_string();
                break;
            }

            on_progress(OptimizationProgress {
                iteration,
                max_iterations: self.config.max_iterations,
                step: OptimizationStep::MinePairs,
            });
            let pairs = mine_pairs(&report.per_epic, self.config.pair_miner);

            on_progress(OptimizationProgress {
                iteration,
                max_iterations: self.config.max_iterations,
                step: OptimizationStep::GeneratePatches,
            });
            let started = std::time::Instant::now();
            self.telemetry.call_started("synthesize_patches");
            let candidates = patch_synthesizer::synthesize(
                self.llm.clone(),
                &self.config.synthesizer,
                &champion.base,
                &champion.patch,
                &pairs,
                self.config.candidates_per_iteration,
            )
            .await
            .unwrap_or_default();
            self.telemetry.call_finished("synthesize_patches", started.elapsed().as_millis() as u64, None);

            if candidates.is_empty() {
                iterations_completed = iteration + 1;
                continue;
            }

            on_progress(OptimizationProgress {
                iteration,
                max_iterations: self.config.max_iterations,
                step: OptimizationStep::Tournament,
            });
            let evaluator = self.evaluator.clone();
            let result = tournament(
                evaluator,
                &champion.base,
                &champion.patch,
                candidates,
                epics,
                self.config.promote_epsilon,
                |_progress: TournamentProgress| {},
            )
            .await;

            // When the NQD selector is enabled, the tournament's epsilon winner is
            // only promotion-eligible if it also lies on the Pareto front and
            // survives tie-breaking; the archive is computed before the
            // promotion decision so it can gate it rather than run alongside it.
            let nqd_archive = if self.config.nqd_enabled {
                let archive_candidates = result
                    .candidates
                    .iter()
                    .map(|scored| promptopt_core::NqdCandidate {
                        id: scored.candidate.id.clone(),
                        objective: scored.report.agg.objective,
                        r_eff: scored.report.agg.objective,
                        schema_valid: !scored.report.inconclusive,
                        profile: promptopt_core::CreativityProfile {
                            novelty_at_context: 0.5,
                            use_value: scored.delta_vs_champion,
                            surprise: 0.0,
                            constraint_fit: 1.0,
                            diversity_p: 0.5,
                        },
                    })
                    .collect();
                Some(nqd_select(archive_candidates, self.config.nqd))
            } else {
                None
            };

            on_progress(OptimizationProgress {
                iteration,
                max_iterations: self.config.max_iterations,
                step: OptimizationStep::PromotionDecision,
            });
            let gated_winner = match (&result.winner, &nqd_archive) {
                (Some(winner_id), Some(archive)) => {
                    let on_front = archive.pareto_front.iter().any(|c| &c.id == winner_id);
                    let survives_tie_break = archive.selected_winner.as_deref() == Some(winner_id.as_str());
                    if on_front && survives_tie_break {
                        Some(winner_id.clone())
                    } else {
                        info!(iteration, winner = %winner_id, "tournament winner rejected: not on NQD Pareto front");
                        None
                    }
                }
                (Some(winner_id), None) => Some(winner_id.clone()),
                (None, _) => None,
            };
            if let Some(winner_id) = &gated_winner {
                if let Some(winner) = result.candidates.iter().find(|c| &c.candidate.id == winner_id) {
                    champion.promote(winner.candidate.patch.clone(), now_unix());
                    promotions += 1;
                    final_objective = winner.report.agg.objective;
                    info!(iteration, winner = %winner_id, objective = final_objective, "promoted challenger");
                }
            }

            if self.config.meta_enabled {
                on_progress(OptimizationProgress {
                    iteration,
                    max_iterations: self.config.max_iterations,
                    step: OptimizationStep::MetaEvolution,
                });

                let pairs_text = serde_json::to_string(&pairs).ok();
                let meta_evaluator = self.evaluator.clone();
                let outcome = meta_engine
                    .run_generation(
                        &mut task_population,
                        &mut mutation_population,
                        iteration,
                        &|task: &TaskPrompt| {
                            let evaluator = meta_evaluator.clone();
                            let prompt = task.composed();
                            Box::pin(async move {
                                let report = evaluator.evaluate("meta-evolution-candidate", &prompt, epics).await;
                                report.agg.objective
                            })
                        },
                        pairs_text.as_deref(),
                        None,
                        &mut rng,
                    )
                    .await;

                if outcome.best_task_prompt.fitness > final_objective + self.config.meta.improvement_epsilon {
                    champion.promote(outcome.best_task_prompt.patch.clone(), now_unix());
                    promotions += 1;
                    final_objective = outcome.best_task_prompt.fitness;
                    info!(iteration, fitness = final_objective, "meta-evolution promoted challenger");
                }
            }

            on_progress(OptimizationProgress {
                iteration,
                max_iterations: self.config.max_iterations,
                step: OptimizationStep::Checkpoint,
            });
            if let Err(error) = checkpoint(champion) {
                terminal_reason = format!("checkpoint failed: {error}");
                iterations_completed = iteration + 1;
                break;
            }

            iterations_completed = iteration + 1;
        }

        OptimizationResult {
            iterations_completed,
            final_objective,
            promotions,
            terminal_reason,
        }
    }

}

fn now_unix() -> i64 {
    promptopt_support::current_unix_timestamp() as i64
}
