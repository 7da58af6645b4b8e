use crate::error::EngineError;

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Global, env-var driven configuration. One struct covers every knob listed
/// in the external-interfaces configuration table; individual components
/// borrow the fields they need rather than maintaining their own copies.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub llm_base_url: String,
    pub llm_api_key: String,
    pub llm_timeout_ms: u64,

    pub opt_concurrency: usize,

    pub eval_replicates: usize,
    pub eval_seed_base: i64,
    pub eval_std_lambda: f64,
    pub eval_fail_penalty: f64,
    pub discoverability_tries: u32,

    pub pair_min_sim: f64,
    pub pair_min_delta: f64,
    pub pair_max_pairs: usize,
    pub pair_stratify_tiers: bool,

    pub promote_epsilon: f64,

    pub meta_task_population_size: usize,
    pub meta_mutation_population_size: usize,
    pub meta_elite_count: usize,
    pub meta_tournament_size: usize,
    pub meta_p_crossover: f64,
    pub meta_p_hypermutation: f64,
    pub meta_max_generations: u64,
    pub meta_improvement_epsilon: f64,

    pub nqd_enabled: bool,
    pub nqd_constraint_fit_threshold: f64,
    pub nqd_use_value_threshold: f64,
    pub nqd_max_front_size: usize,
    pub nqd_include_dominated: bool,

    pub telemetry_preview_enabled: bool,
    pub telemetry_preview_len: usize,
    pub telemetry_flush_interval_ms: u64,

    pub task_reap_after_secs: i64,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, EngineError> {
        let llm_base_url = std::env::var("LLM_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let llm_api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| EngineError::Configuration("LLM_API_KEY is not set".to_string()))?;

        Ok(Self {
            llm_base_url,
            llm_api_key,
            llm_timeout_ms: env_parse("LLM_TIMEOUT_MS", 120_000),

            opt_concurrency: env_parse("OPT_CONCURRENCY", 4),

            eval_replicates: env_parse("EVAL_REPLICATES", 5),
            eval_seed_base: env_parse("EVAL_SEED_BASE", 1),
            eval_std_lambda: env_parse("EVAL_STD_LAMBDA", 0.10),
            eval_fail_penalty: env_parse("EVAL_FAIL_PENALTY", 0.20),
            discoverability_tries: env_parse("DISCOVERABILITY_TRIES", 3),

            pair_min_sim: env_parse("PAIR_MIN_SIM", 0.5),
            pair_min_delta: env_parse("PAIR_MIN_DELTA", 0.2),
            pair_max_pairs: env_parse("PAIR_MAX_PAIRS", 20),
            pair_stratify_tiers: env_parse("PAIR_STRATIFY_TIERS", false),

            promote_epsilon: env_parse("PROMOTE_EPSILON", 0.01),

            meta_task_population_size: env_parse("META_TASK_POPULATION_SIZE", 12),
            meta_mutation_population_size: env_parse("META_MUTATION_POPULATION_SIZE", 8),
            meta_elite_count: env_parse("META_ELITE_COUNT", 2),
            meta_tournament_size: env_parse("META_TOURNAMENT_SIZE", 3),
            meta_p_crossover: env_parse("META_P_CROSSOVER", 0.2),
            meta_p_hypermutation: env_parse("META_P_HYPERMUTATION", 0.1),
            meta_max_generations: env_parse("META_MAX_GENERATIONS", 50),
            meta_improvement_epsilon: env_parse("META_IMPROVEMENT_EPSILON", 0.01),

            nqd_enabled: env_parse("NQD_ENABLED", true),
            nqd_constraint_fit_threshold: env_parse("NQD_CONSTRAINT_FIT_THRESHOLD", 1.0),
            nqd_use_value_threshold: env_parse("NQD_USE_VALUE_THRESHOLD", 0.0),
            nqd_max_front_size: env_parse("NQD_MAX_FRONT_SIZE", 10),
            nqd_include_dominated: env_parse("NQD_INCLUDE_DOMINATED", false),

            telemetry_preview_enabled: env_parse("TELEMETRY_PREVIEW_ENABLED", true),
            telemetry_preview_len: env_parse("TELEMETRY_PREVIEW_LEN", 200),
            telemetry_flush_interval_ms: env_parse("TELEMETRY_FLUSH_INTERVAL_MS", 5_000),

            task_reap_after_secs: env_parse("TASK_REAP_AFTER_SECS", 3_600),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_from_env_fails_without_api_key() {
        std::env::remove_var("LLM_API_KEY");
        let result = EngineConfig::from_env();
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn unit_from_env_applies_defaults_when_unset() {
        std::env::set_var("LLM_API_KEY", "test-key");
        std::env::remove_var("OPT_CONCURRENCY");
        let config = EngineConfig::from_env().expect("config");
        assert_eq!(config.opt_concurrency, 4);
        assert_eq!(config.eval_replicates, 5);
        std::env::remove_var("LLM_API_KEY");
    }
}
