use serde::{Deserialize, Serialize};

use crate::distribution::ScoredGenerateResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairTier {
    High,
    Medium,
    Low,
}

impl PairTier {
    /// HIGH ≥ 0.75, MEDIUM ∈ [0.50, 0.75), LOW < 0.50, tiered by the
    /// "good" run's score.
    pub fn from_good_score(good_score: f64) -> Self {
        if good_score >= 0.75 {
            PairTier::High
        } else if good_score >= 0.50 {
            PairTier::Medium
        } else {
            PairTier::Low
        }
    }
}

/// Two same-epic outputs with high textual similarity but a large quality
/// delta. Invariant: `good.score >= bad.score`; `score_delta = good.score -
/// bad.score`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContrastPair {
    pub epic_id: String,
    pub good: ScoredGenerateResult,
    pub bad: ScoredGenerateResult,
    pub similarity: f64,
    pub score_delta: f64,
    pub tier: PairTier,
    pub primary_metric: Option<String>,
    pub error_analysis: Vec<String>,
}
