//! Meta-Evolution Engine: co-evolves a task-prompt population and a
//! mutation-prompt population, applying mutations via LLM calls and scoring
//! children against a caller-supplied fitness function.

pub mod engine;
pub mod mutation_apply;
pub mod population;

pub use engine::{FitnessFn, GenerationOutcome, MetaEvolutionConfig, MetaEvolutionEngine};
pub use mutation_apply::{apply_mutation, MutationContext};
