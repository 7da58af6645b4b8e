mod cli_args;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use promptopt_core::{Epic, EngineConfig};
use promptopt_eval::{generator::GeneratorClient, DistributionalEvaluator, DistributionalEvaluatorConfig};
use promptopt_llm::{LlmClient, OpenAiCompatibleClient, OpenAiConfig};
use promptopt_mining::{mine_pairs, patch_synthesizer, PairMinerConfig};
use promptopt_orchestrator::{CancellationToken, LoopConfig, LoopOrchestrator, TaskStore, TelemetrySink};
use promptopt_select::{tournament, NqdSelectorConfig};
use tokio::sync::Semaphore;
use tracing::error;

use cli_args::{Cli, Command};

const EXIT_SUCCESS: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 1;
const EXIT_EVALUATION_FAILURE: u8 = 2;
const EXIT_CANCELLED: u8 = 3;

fn read_epics(path: &Path) -> anyhow::Result<Vec<Epic>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn read_text_or_empty(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(String::new()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let engine_config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("configuration error: {error}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let llm: Arc<dyn LlmClient> = match OpenAiCompatibleClient::new(OpenAiConfig {
        api_base: engine_config.llm_base_url.clone(),
        api_key: engine_config.llm_api_key.clone(),
        request_timeout_ms: engine_config.llm_timeout_ms,
    }) {
        Ok(client) => Arc::new(client),
        Err(error) => {
            eprintln!("failed to build LLM client: {error}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

    let exit_code = match run(cli.command, llm, model, &engine_config).await {
        Ok(code) => code,
        Err(error) => {
            error!(%error, "command failed");
            eprintln!("error: {error}");
            EXIT_EVALUATION_FAILURE
        }
    };
    ExitCode::from(exit_code)
}

async fn run(command: Command, llm: Arc<dyn LlmClient>, model: String, engine_config: &EngineConfig) -> anyhow::Result<u8> {
    match command {
        Command::Optimize {
            epics_file,
            champion_file,
            max_iterations,
        } => {
            let epics = read_epics(&epics_file)?;
            let mut champion = promptopt_orchestrator::champion_store::load_or_seed(
                &champion_file,
                "Generate a well-formed INVEST user story pack for the given epic.",
                promptopt_support::current_unix_timestamp() as i64,
            );

            let telemetry = Arc::new(TelemetrySink::new(
                engine_config.telemetry_preview_enabled,
                engine_config.telemetry_preview_len,
            ));
            let loop_config = LoopConfig {
                max_iterations: max_iterations.unwrap_or(engine_config.meta_max_generations),
                concurrency: engine_config.opt_concurrency,
                eval: DistributionalEvaluatorConfig {
                    replicates: engine_config.eval_replicates,
                    seed_base: engine_config.eval_seed_base,
                    discoverability_tries: engine_config.discoverability_tries,
                    std_lambda: engine_config.eval_std_lambda,
                    fail_penalty: engine_config.eval_fail_penalty,
                    max_tokens: 1_024,
                },
                pair_miner: PairMinerConfig {
                    min_sim: engine_config.pair_min_sim,
                    min_delta: engine_config.pair_min_delta,
                    max_pairs: engine_config.pair_max_pairs,
                    stratify_tiers: engine_config.pair_stratify_tiers,
                },
                synthesizer: patch_synthesizer::PatchSynthesizerConfig {
                    model: model.clone(),
                    ..patch_synthesizer::PatchSynthesizerConfig::default()
                },
                nqd: NqdSelectorConfig {
                    constraint_fit_threshold: engine_config.nqd_constraint_fit_threshold,
                    use_value_threshold: engine_config.nqd_use_value_threshold,
                    max_front_size: engine_config.nqd_max_front_size,
                },
                nqd_enabled: engine_config.nqd_enabled,
                meta: promptopt_evolve::MetaEvolutionConfig {
                    task_population_size: engine_config.meta_task_population_size,
                    mutation_population_size: engine_config.meta_mutation_population_size,
                    elite_count: engine_config.meta_elite_count,
                    tournament_size: engine_config.meta_tournament_size,
                    p_crossover: engine_config.meta_p_crossover,
                    p_hypermutation: engine_config.meta_p_hypermutation,
                    improvement_epsilon: engine_config.meta_improvement_epsilon,
                    stagnation_generations: 3,
                },
                meta_enabled: true,
                promote_epsilon: engine_config.promote_epsilon,
                candidates_per_iteration: 5,
            };

            let task_store = TaskStore::new();
            let task_id = task_store.create(
                promptopt_core::OptimizationRequestConfig {
                    epics: epics.clone(),
                    max_iterations: loop_config.max_iterations,
                },
                promptopt_support::current_unix_timestamp() as i64,
            );

            let orchestrator = LoopOrchestrator::new(llm, model, telemetry, loop_config);
            let cancellation = CancellationToken::new();
            let result = orchestrator
                .run(
                    &mut champion,
                    &epics,
                    &cancellation,
                    |progress| {
                        tracing::info!(iteration = progress.iteration, step = ?progress.step, "optimization progress");
                        task_store.update_progress(&task_id, progress);
                    },
                    |champion| promptopt_orchestrator::champion_store::save(&champion_file, champion),
                )
                .await;

            task_store.complete(&task_id, result.clone(), promptopt_support::current_unix_timestamp() as i64);

            println!("{}", serde_json::to_string_pretty(&result)?);
            if result.terminal_reason == "cancelled" {
                return Ok(EXIT_CANCELLED);
            }
            Ok(EXIT_SUCCESS)
        }

        Command::Evaluate {
            epics_file,
            base_file,
            patch_file,
        } => {
            let epics = read_epics(&epics_file)?;
            let base = std::fs::read_to_string(&base_file)?;
            let patch = read_text_or_empty(patch_file.as_deref())?;
            let prompt_text = promptopt_core::compose_effective_prompt(&base, &patch);

            let generator = Arc::new(GeneratorClient::new(llm, model));
            let semaphore = Arc::new(Semaphore::new(engine_config.opt_concurrency.max(1)));
            let evaluator = DistributionalEvaluator::new(
                generator,
                semaphore,
                DistributionalEvaluatorConfig {
                    replicates: engine_config.eval_replicates,
                    seed_base: engine_config.eval_seed_base,
                    discoverability_tries: engine_config.discoverability_tries,
                    std_lambda: engine_config.eval_std_lambda,
                    fail_penalty: engine_config.eval_fail_penalty,
                    max_tokens: 1_024,
                },
            );
            let report = evaluator.evaluate("cli-prompt", &prompt_text, &epics).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.inconclusive {
                return Ok(EXIT_EVALUATION_FAILURE);
            }
            Ok(EXIT_SUCCESS)
        }

        Command::MinePairs {
            epics_file,
            base_file,
            patch_file,
        } => {
            let epics = read_epics(&epics_file)?;
            let base = std::fs::read_to_string(&base_file)?;
            let patch = read_text_or_empty(patch_file.as_deref())?;
            let prompt_text = promptopt_core::compose_effective_prompt(&base, &patch);

            let generator = Arc::new(GeneratorClient::new(llm, model));
            let semaphore = Arc::new(Semaphore::new(engine_config.opt_concurrency.max(1)));
            let evaluator = DistributionalEvaluator::new(
                generator,
                semaphore,
                DistributionalEvaluatorConfig {
                    replicates: engine_config.eval_replicates,
                    seed_base: engine_config.eval_seed_base,
                    discoverability_tries: engine_config.discoverability_tries,
                    std_lambda: engine_config.eval_std_lambda,
                    fail_penalty: engine_config.eval_fail_penalty,
                    max_tokens: 1_024,
                },
            );
            let report = evaluator.evaluate("cli-prompt", &prompt_text, &epics).await;
            let pairs = mine_pairs(
                &report.per_epic,
                PairMinerConfig {
                    min_sim: engine_config.pair_min_sim,
                    min_delta: engine_config.pair_min_delta,
                    max_pairs: engine_config.pair_max_pairs,
                    stratify_tiers: engine_config.pair_stratify_tiers,
                },
            );
            println!("{}", serde_json::to_string_pretty(&pairs)?);
            Ok(EXIT_SUCCESS)
        }

        Command::GeneratePatches {
            epics_file: _,
            base_file,
            patch_file,
            count,
        } => {
            let base = std::fs::read_to_string(&base_file)?;
            let patch = read_text_or_empty(patch_file.as_deref())?;
            let config = patch_synthesizer::PatchSynthesizerConfig {
                model,
                ..patch_synthesizer::PatchSynthesizerConfig::default()
            };
            let candidates = patch_synthesizer::synthesize(llm, &config, &base, &patch, &[], count).await?;
            println!("{}", serde_json::to_string_pretty(&candidates)?);
            Ok(EXIT_SUCCESS)
        }

        Command::Tournament {
            epics_file,
            base_file,
            champion_patch_file,
            candidates_file,
        } => {
            let epics = read_epics(&epics_file)?;
            let base = std::fs::read_to_string(&base_file)?;
            let champion_patch = read_text_or_empty(champion_patch_file.as_deref())?;
            let candidates_text = std::fs::read_to_string(&candidates_file)?;
            let candidates: Vec<promptopt_core::PatchCandidate> = serde_json::from_str(&candidates_text)?;

            let generator = Arc::new(GeneratorClient::new(llm, model));
            let semaphore = Arc::new(Semaphore::new(engine_config.opt_concurrency.max(1)));
            let evaluator = Arc::new(DistributionalEvaluator::new(
                generator,
                semaphore,
                DistributionalEvaluatorConfig {
                    replicates: engine_config.eval_replicates,
                    seed_base: engine_config.eval_seed_base,
                    discoverability_tries: engine_config.discoverability_tries,
                    std_lambda: engine_config.eval_std_lambda,
                    fail_penalty: engine_config.eval_fail_penalty,
                    max_tokens: 1_024,
                },
            ));
            let result = tournament(
                evaluator,
                &base,
                &champion_patch,
                candidates,
                &epics,
                engine_config.promote_epsilon,
                |_progress| {},
            )
            .await;
            println!(
                "{}",
                serde_json::json!({
                    "championObjective": result.champion_objective,
                    "winner": result.winner,
                })
            );
            Ok(EXIT_SUCCESS)
        }
    }
}
