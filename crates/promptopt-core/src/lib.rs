//! Shared data model and configuration for the prompt-optimization engine:
//! the types that flow between the generator, scorers, judge panel,
//! assurance aggregator, pair miner, tournament, NQD selector, and
//! meta-evolution engine, plus the env-var driven [`config::EngineConfig`]
//! and the [`error::EngineError`] taxonomy.

pub mod assurance;
pub mod champion;
pub mod config;
pub mod creativity;
pub mod criteria;
pub mod distribution;
pub mod epic;
pub mod error;
pub mod judge;
pub mod mutation;
pub mod nqd;
pub mod pairs;
pub mod patch;
pub mod task;
pub mod task_prompt;

pub use assurance::{AssuranceCitation, AssuranceStatus, AssuranceTuple, CoverageScope, Gate, ImprovementPaths};
pub use champion::{Champion, ChampionSnapshot, CHAMPION_HISTORY_LIMIT};
pub use config::EngineConfig;
pub use creativity::CreativityProfile;
pub use criteria::Criterion;
pub use distribution::{AggregateStats, EpicDistResult, PromptDistReport, ScoredGenerateResult};
pub use epic::{Epic, GenerateResult, StoryPack, UserStory};
pub use error::EngineError;
pub use judge::{max_pairwise_delta, CongruenceLevel, FormalityLevel, JudgeOutput};
pub use mutation::{MutationKind, MutationPrompt, SUCCESS_RATE_ALPHA};
pub use nqd::{IlluminationTelemetry, NqdArchive, NqdCandidate};
pub use pairs::{ContrastPair, PairTier};
pub use patch::{compose_effective_prompt, PatchCandidate, EFFECTIVE_PROMPT_SEPARATOR};
pub use task::{
    OptimizationProgress, OptimizationRequestConfig, OptimizationResult, OptimizationStep,
    OptimizationTask, TaskStatus,
};
pub use task_prompt::TaskPrompt;
