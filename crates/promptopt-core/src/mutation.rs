use serde::{Deserialize, Serialize};

/// Smoothing factor for the mutation fitness exponential moving average.
pub const SUCCESS_RATE_ALPHA: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationKind {
    Direct,
    Eda,
    Hypermutation,
    Lamarckian,
    Crossover,
    ZeroOrderHyper,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationPrompt {
    pub id: String,
    pub text: String,
    pub kind: MutationKind,
    pub fitness: f64,
    pub usage_count: u64,
    pub success_rate: f64,
    pub generation: u64,
    pub parent_id: Option<String>,
}

impl MutationPrompt {
    /// Rewards or penalizes this mutation prompt after one application.
    /// `success_rate <- alpha*1[improved] + (1-alpha)*success_rate`,
    /// `usage_count += 1`, `fitness <- success_rate`.
    pub fn record_outcome(&mut self, improved_beyond_epsilon: bool) {
        let indicator = if improved_beyond_epsilon { 1.0 } else { 0.0 };
        self.success_rate = SUCCESS_RATE_ALPHA * indicator + (1.0 - SUCCESS_RATE_ALPHA) * self.success_rate;
        self.usage_count += 1;
        self.fitness = self.success_rate;
    }
}
