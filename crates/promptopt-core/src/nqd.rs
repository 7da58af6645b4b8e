use serde::{Deserialize, Serialize};

use crate::creativity::CreativityProfile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NqdCandidate {
    pub id: String,
    pub objective: f64,
    pub r_eff: f64,
    pub schema_valid: bool,
    pub profile: CreativityProfile,
}

/// Coverage, QD-score, objective spread, and average novelty/diversity
/// computed over the pruned front. Reported but never used to break ties or
/// influence dominance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IlluminationTelemetry {
    pub coverage: f64,
    pub qd_score: f64,
    pub objective_spread: f64,
    pub average_novelty: f64,
    pub average_diversity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NqdArchive {
    pub pareto_front: Vec<NqdCandidate>,
    pub dominated: Vec<NqdCandidate>,
    pub ineligible: Vec<NqdCandidate>,
    pub illumination: IlluminationTelemetry,
    pub selected_winner: Option<String>,
    pub timestamp: i64,
}
