use serde::{Deserialize, Serialize};

use crate::assurance::AssuranceTuple;
use crate::epic::GenerateResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredGenerateResult {
    pub result: GenerateResult,
    pub score: f64,
    /// Weakest-link verdict from the judge panel; `None` when the schema was
    /// invalid (no story pack to judge) or every judge failed.
    #[serde(default)]
    pub assurance: Option<AssuranceTuple>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpicDistResult {
    pub epic_id: String,
    pub runs: Vec<ScoredGenerateResult>,
    pub mean_score: f64,
    pub p10_score: f64,
    pub std_score: f64,
    pub pass_rate: f64,
    pub discoverability_k: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateStats {
    pub mean_of_means: f64,
    pub mean_pass_rate: f64,
    pub mean_p10: f64,
    pub mean_std: f64,
    pub objective: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDistReport {
    pub prompt_id: String,
    pub per_epic: Vec<EpicDistResult>,
    pub agg: AggregateStats,
    /// Set when at least half of all runs across all epics errored.
    pub inconclusive: bool,
}
