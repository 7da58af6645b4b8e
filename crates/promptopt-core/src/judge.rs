use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::criteria::Criterion;

/// One LLM judge's verdict. `overall_score` is the weight-normalized sum of
/// the per-criterion scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeOutput {
    pub judge_id: String,
    pub per_criterion: BTreeMap<Criterion, (f64, String)>,
    pub overall_score: f64,
    pub latency_ms: u64,
    pub timestamp: i64,
}

impl JudgeOutput {
    /// Recomputes `overall_score` from `per_criterion` using each
    /// criterion's fixed weight. Callers that trust an externally supplied
    /// score can skip this; it exists so tests and the panel aggregator can
    /// verify the invariant independently.
    pub fn weighted_overall(&self) -> f64 {
        self.per_criterion
            .iter()
            .map(|(criterion, (score, _))| criterion.weight() * score)
            .sum()
    }

    pub fn formality_score(&self) -> Option<f64> {
        self.per_criterion
            .get(&Criterion::Testable)
            .map(|(score, _)| *score)
    }

    /// Buckets this judge's `gwt_format` score into a [`FormalityLevel`].
    /// Absent a `gwt_format` verdict, the judge contributes the lowest level
    /// so it never inflates the aggregator's `min`.
    pub fn formality_level(&self) -> FormalityLevel {
        let score = self
            .per_criterion
            .get(&Criterion::GwtFormat)
            .map(|(score, _)| *score)
            .unwrap_or(0.0);
        if score >= 0.85 {
            FormalityLevel::ProofGrade
        } else if score >= 0.65 {
            FormalityLevel::Formalizable
        } else if score >= 0.35 {
            FormalityLevel::Structured
        } else {
            FormalityLevel::Informal
        }
    }
}

/// Ordinal measure of inter-judge agreement. Never averaged — only `min`,
/// thresholded mapping, and comparison are meaningful operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CongruenceLevel {
    /// CL0
    WeakGuess,
    /// CL1
    Plausible,
    /// CL2
    Validated,
    /// CL3
    Verified,
}

impl CongruenceLevel {
    /// Derives CL from the max pairwise delta of judges' overall scores
    /// against the fixed thresholds `{0.10, 0.25, 0.40}`.
    pub fn from_delta(delta: f64) -> Self {
        if delta >= 0.40 {
            CongruenceLevel::WeakGuess
        } else if delta >= 0.25 {
            CongruenceLevel::Plausible
        } else if delta >= 0.10 {
            CongruenceLevel::Validated
        } else {
            CongruenceLevel::Verified
        }
    }

    /// The disagreement penalty `Φ(CL)`. Monotone non-increasing in CL
    /// level: `Φ(CL0) ≥ Φ(CL1) ≥ Φ(CL2) ≥ Φ(CL3) = 0`.
    pub fn phi(self) -> f64 {
        match self {
            CongruenceLevel::Verified => 0.0,
            CongruenceLevel::Validated => 0.05,
            CongruenceLevel::Plausible => 0.15,
            CongruenceLevel::WeakGuess => 0.30,
        }
    }
}

/// Ordinal measure of structural rigor. Never averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormalityLevel {
    /// F0
    Informal,
    /// F1
    Structured,
    /// F2
    Formalizable,
    /// F3
    ProofGrade,
}

/// Computes `max(scores) - min(scores)`; callers must supply at least two
/// scores (the panel only computes congruence when `≥2` judges survive).
pub fn max_pairwise_delta(scores: &[f64]) -> f64 {
    let max = scores.iter().cloned().fold(f64::MIN, f64::max);
    let min = scores.iter().cloned().fold(f64::MAX, f64::min);
    (max - min).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_phi_is_non_increasing_across_levels() {
        assert!(CongruenceLevel::WeakGuess.phi() >= CongruenceLevel::Plausible.phi());
        assert!(CongruenceLevel::Plausible.phi() >= CongruenceLevel::Validated.phi());
        assert!(CongruenceLevel::Validated.phi() >= CongruenceLevel::Verified.phi());
        assert_eq!(CongruenceLevel::Verified.phi(), 0.0);
    }

    #[test]
    fn unit_from_delta_matches_threshold_boundaries() {
        assert_eq!(CongruenceLevel::from_delta(0.05), CongruenceLevel::Verified);
        assert_eq!(CongruenceLevel::from_delta(0.10), CongruenceLevel::Validated);
        assert_eq!(CongruenceLevel::from_delta(0.25), CongruenceLevel::Plausible);
        assert_eq!(CongruenceLevel::from_delta(0.45), CongruenceLevel::WeakGuess);
    }

    #[test]
    fn functional_scenario_2_congruence_and_weakest_link_inputs() {
        let delta = max_pairwise_delta(&[0.95, 0.50, 0.70]);
        assert!((delta - 0.45).abs() < 1e-9);
        assert_eq!(CongruenceLevel::from_delta(delta), CongruenceLevel::WeakGuess);
        assert_eq!(CongruenceLevel::WeakGuess.phi(), 0.30);
    }

    #[test]
    fn unit_congruence_level_ordering_is_increasing_agreement() {
        assert!(CongruenceLevel::WeakGuess < CongruenceLevel::Plausible);
        assert!(CongruenceLevel::Validated < CongruenceLevel::Verified);
    }
}
