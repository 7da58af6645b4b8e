use std::sync::Arc;

use futures::future::BoxFuture;
use rand::Rng;
use tracing::{debug, warn};
use uuid::Uuid;

use promptopt_core::{MutationKind, MutationPrompt, TaskPrompt};
use promptopt_llm::LlmClient;

use crate::mutation_apply::{apply_mutation, MutationContext};
use crate::population;

/// Tunables for one run of the Meta-Evolution Engine, mirroring the
/// per-generation algorithm: elite carry-over, tournament-selected parents,
/// probabilistic crossover, fitness-proportional mutation selection, and
/// probabilistic hypermutation.
#[derive(Debug, Clone)]
pub struct MetaEvolutionConfig {
    pub task_population_size: usize,
    pub mutation_population_size: usize,
    pub elite_count: usize,
    pub tournament_size: usize,
    pub p_crossover: f64,
    pub p_hypermutation: f64,
    /// Minimum fitness delta over a parent counted as "improved" for reward
    /// purposes; compared against the parent, never the population best.
    pub improvement_epsilon: f64,
    /// Consecutive zero-success generations before `converged()` is true.
    pub stagnation_generations: u32,
}

impl Default for MetaEvolutionConfig {
    fn default() -> Self {
        Self {
            task_population_size: 12,
            mutation_population_size: 8,
            elite_count: 2,
            tournament_size: 3,
            p_crossover: 0.2,
            p_hypermutation: 0.1,
            improvement_epsilon: 0.01,
            stagnation_generations: 3,
        }
    }
}

/// Evaluates a candidate task prompt's fitness. Callers typically wire this
/// to the Distributional Evaluator's objective over a held-out epic sample.
pub type FitnessFn<'a> = dyn Fn(&TaskPrompt) -> BoxFuture<'a, f64> + Send + Sync + 'a;

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub generation: u64,
    pub successful_mutations: usize,
    pub best_task_prompt: TaskPrompt,
}

/// Drives the dual task/mutation-prompt population across generations,
/// tracking convergence and the best-known task prompt.
pub struct MetaEvolutionEngine {
    llm: Arc<dyn LlmClient>,
    model: String,
    config: MetaEvolutionConfig,
    consecutive_stagnant_generations: u32,
    best_known: Option<TaskPrompt>,
}

impl MetaEvolutionEngine {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, config: MetaEvolutionConfig) -> Self {
        Self {
            llm,
            model: model.into(),
            config,
            consecutive_stagnant_generations: 0,
            best_known: None,
        }
    }

    /// Stops when `stagnation_generations` consecutive generations produced
    /// zero successful mutations.
    pub fn converged(&self) -> bool {
        self.consecutive_stagnant_generations >= self.config.stagnation_generations
    }

    pub fn best_known(&self) -> Option<&TaskPrompt> {
        self.best_known.as_ref()
    }

    /// Runs one generation in place over `task_population` and
    /// `mutation_population`, replacing the former with the next generation
    /// and updating the latter's fitness/success-rate bookkeeping.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_generation<R: Rng + ?Sized>(
        &mut self,
        task_population: &mut Vec<TaskPrompt>,
        mutation_population: &mut [MutationPrompt],
        generation: u64,
        fitness_fn: &FitnessFn<'_>,
        pairs_text: Option<&str>,
        exemplar_text: Option<&str>,
        rng: &mut R,
    ) -> GenerationOutcome {
        let previous_generation = task_population.clone();
        let mut next_population = population::elite_carry_over(&previous_generation, self.config.elite_count);
        let mut successful_mutations = 0usize;

        while next_population.len() < self.config.task_population_size {
            let attempt_crossover = previous_generation.len() >= 2 && rng.gen_bool(self.config.p_crossover);

            let child = if attempt_crossover {
                self.try_crossover(&previous_generation, generation, rng).await
            } else {
                self.try_mutation(
                    &previous_generation,
                    mutation_population,
                    generation,
                    pairs_text,
                    exemplar_text,
                    rng,
                )
                .await
            };

            let Some((mut child, parent_fitness, mutation_index)) = child else {
                // LLM call failed; fall back to re-inserting a tournament winner
                // so the population still reaches full size.
                let survivor = population::tournament_select(&previous_generation, self.config.tournament_size, rng);
                next_population.push(survivor.clone());
                continue;
            };

            child.fitness = fitness_fn(&child).await;
            let improved = child.fitness > parent_fitness + self.config.improvement_epsilon;
            if improved {
                successful_mutations += 1;
            }
            if let Some(index) = mutation_index {
                mutation_population[index].record_outcome(improved);
            }
            next_population.push(child);
        }

        if let Some(index) = population::lowest_fitness_mutation_index(mutation_population) {
            if rng.gen_bool(self.config.p_hypermutation) {
                let worst_fitness = mutation_population[index].fitness;
                self.hypermutate(mutation_population, index, worst_fitness, generation).await;
            }
        }

        *task_population = next_population;

        let best = task_population
            .iter()
            .max_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap())
            .cloned()
            .expect("task population is non-empty");

        let improved_best = self
            .best_known
            .as_ref()
            .map(|known| best.fitness > known.fitness)
            .unwrap_or(true);
        if improved_best {
            self.best_known = Some(best.clone());
        }

        if successful_mutations == 0 {
            self.consecutive_stagnant_generations += 1;
        } else {
            self.consecutive_stagnant_generations = 0;
        }

        debug!(generation, successful_mutations, converged = self.converged(), "meta-evolution generation complete");

        GenerationOutcome {
            generation,
            successful_mutations,
            best_task_prompt: best,
        }
    }

    async fn try_crossover<R: Rng + ?Sized>(
        &self,
        population: &[TaskPrompt],
        generation: u64,
        rng: &mut R,
    ) -> Option<(TaskPrompt, f64, Option<usize>)> {
        let (first, second) = population::distinct_crossover_parents(population, self.config.tournament_size, rng)?;
        let synthetic = MutationPrompt {
            id: format!("crossover-{}", Uuid::new_v4()),
            text: "Combine the two patches, keeping what each does well.".to_string(),
            kind: MutationKind::Crossover,
            fitness: 0.0,
            usage_count: 0,
            success_rate: 0.0,
            generation,
            parent_id: None,
        };
        let context = MutationContext {
            second_parent_patch: Some(second.patch.clone()),
            ..Default::default()
        };
        match apply_mutation(&self.llm, &self.model, &synthetic, first, &context).await {
            Ok(patch) => Some((
                TaskPrompt {
                    id: Uuid::new_v4().to_string(),
                    base: first.base.clone(),
                    patch,
                    fitness: 0.0,
                    generation,
                    mutation_id: None,
                    parent_id: Some(first.id.clone()),
                },
                first.fitness,
                None,
            )),
            Err(error) => {
                warn!(%error, "crossover LLM call failed");
                None
            }
        }
    }

    async fn try_mutation<R: Rng + ?Sized>(
        &self,
        population: &[TaskPrompt],
        mutation_population: &[MutationPrompt],
        generation: u64,
        pairs_text: Option<&str>,
        exemplar_text: Option<&str>,
        rng: &mut R,
    ) -> Option<(TaskPrompt, f64, Option<usize>)> {
        let parent = population::tournament_select(population, self.config.tournament_size, rng);
        let mutation_index = population::roulette_select(mutation_population, rng);
        let mutation = &mutation_population[mutation_index];
        let context = MutationContext {
            contrastive_pairs_text: pairs_text.map(str::to_string),
            exemplar_text: exemplar_text.map(str::to_string),
            ..Default::default()
        };
        match apply_mutation(&self.llm, &self.model, mutation, parent, &context).await {
            Ok(patch) => Some((
                TaskPrompt {
                    id: Uuid::new_v4().to_string(),
                    base: parent.base.clone(),
                    patch,
                    fitness: 0.0,
                    generation,
                    mutation_id: Some(mutation.id.clone()),
                    parent_id: Some(parent.id.clone()),
                },
                parent.fitness,
                Some(mutation_index),
            )),
            Err(error) => {
                warn!(%error, "mutation LLM call failed");
                None
            }
        }
    }

    async fn hypermutate(
        &self,
        mutation_population: &mut [MutationPrompt],
        target_index: usize,
        target_fitness: f64,
        generation: u64,
    ) {
        let target = mutation_population[target_index].clone();
        let hyper = MutationPrompt {
            id: format!("hyper-{}", Uuid::new_v4()),
            text: "Rewrite the weakest mutation instruction given its track record.".to_string(),
            kind: MutationKind::Hypermutation,
            fitness: 0.0,
            usage_count: 0,
            success_rate: 0.0,
            generation,
            parent_id: None,
        };
        let placeholder_parent = TaskPrompt {
            id: "hypermutation-target".to_string(),
            base: String::new(),
            patch: String::new(),
            fitness: target_fitness,
            generation,
            mutation_id: None,
            parent_id: None,
        };
        let context = MutationContext {
            hypermutation_target: Some(target.clone()),
            ..Default::default()
        };
        match apply_mutation(&self.llm, &self.model, &hyper, &placeholder_parent, &context).await {
            Ok(rewritten_text) => {
                mutation_population[target_index] = MutationPrompt {
                    id: format!("{}-h{}", target.id, generation),
                    text: rewritten_text,
                    kind: target.kind,
                    fitness: 0.0,
                    usage_count: 0,
                    success_rate: 0.0,
                    generation,
                    parent_id: Some(target.id),
                };
            }
            Err(error) => warn!(%error, "hypermutation LLM call failed, leaving target unchanged"),
        }
    }
}
