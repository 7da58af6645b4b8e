use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreativityProfile {
    pub novelty_at_context: f64,
    pub use_value: f64,
    pub surprise: f64,
    pub constraint_fit: f64,
    pub diversity_p: f64,
}
