use chrono::Utc;
use promptopt_core::{CreativityProfile, IlluminationTelemetry, NqdArchive, NqdCandidate};

#[derive(Debug, Clone, Copy)]
pub struct NqdSelectorConfig {
    pub constraint_fit_threshold: f64,
    pub use_value_threshold: f64,
    pub max_front_size: usize,
}

impl Default for NqdSelectorConfig {
    fn default() -> Self {
        Self {
            constraint_fit_threshold: 1.0,
            use_value_threshold: 0.0,
            max_front_size: 10,
        }
    }
}

/// A dominates B iff A is `>=` B on every Q-dimension and strictly `>` on at
/// least one, over `{R_eff, useValue}` only.
fn dominates(a: &NqdCandidate, b: &NqdCandidate) -> bool {
    let ge_all = a.r_eff >= b.r_eff && a.profile.use_value >= b.profile.use_value;
    let gt_any = a.r_eff > b.r_eff || a.profile.use_value > b.profile.use_value;
    ge_all && gt_any
}

/// Strict 5-step pipeline (reordering is forbidden):
/// eligibility gate → creativity profile (precomputed by the caller) →
/// Pareto dominance → front pruning by `useValue` → tie-break.
/// Illumination telemetry is computed on the pruned front but never used to
/// break ties or influence dominance.
pub fn select(candidates: Vec<NqdCandidate>, config: NqdSelectorConfig) -> NqdArchive {
    // 1. Eligibility gate.
    let mut eligible = Vec::new();
    let mut ineligible = Vec::new();
    for candidate in candidates {
        if candidate.profile.constraint_fit >= config.constraint_fit_threshold
            || candidate.profile.use_value > config.use_value_threshold
        {
            eligible.push(candidate);
        } else {
            ineligible.push(candidate);
        }
    }

    // 2. Creativity profile: already attached to each candidate by the
    // caller (novelty, use_value, surprise, constraint_fit, diversity_p).

    // 3. Pareto dominance over {R_eff, useValue}.
    let mut front = Vec::new();
    let mut dominated = Vec::new();
    for (i, candidate) in eligible.iter().enumerate() {
        let is_dominated = eligible
            .iter()
            .enumerate()
            .any(|(j, other)| i != j && dominates(other, candidate));
        if is_dominated {
            dominated.push(candidate.clone());
        } else {
            front.push(candidate.clone());
        }
    }

    // 4. Prune front by descending useValue if oversized.
    front.sort_by(|a, b| b.profile.use_value.partial_cmp(&a.profile.use_value).unwrap());
    if front.len() > config.max_front_size {
        let overflow = front.split_off(config.max_front_size);
        dominated.extend(overflow);
    }

    // 5. Tie-break: (a) constraintFit>=1, (b) higher useValue, (c) higher
    // diversityP, (d) higher noveltyAtContext.
    let selected_winner = tie_break(&front, config.constraint_fit_threshold);

    let illumination = illumination_telemetry(&front);

    NqdArchive {
        pareto_front: front,
        dominated,
        ineligible,
        illumination,
        selected_winner,
        timestamp: Utc::now().timestamp(),
    }
}

fn tie_break(front: &[NqdCandidate], constraint_fit_threshold: f64) -> Option<String> {
    front
        .iter()
        .max_by(|a, b| {
            let key = |c: &NqdCandidate| {
                (
                    c.profile.constraint_fit >= constraint_fit_threshold,
                    ordered(c.profile.use_value),
                    ordered(c.profile.diversity_p),
                    ordered(c.profile.novelty_at_context),
                )
            };
            key(a).cmp(&key(b))
        })
        .map(|c| c.id.clone())
}

fn ordered(value: f64) -> i64 {
    (value * 1_000_000.0).round() as i64
}

fn illumination_telemetry(front: &[NqdCandidate]) -> IlluminationTelemetry {
    if front.is_empty() {
        return IlluminationTelemetry::default();
    }
    let n = front.len() as f64;
    let objectives: Vec<f64> = front.iter().map(|c| c.objective).collect();
    let max_obj = objectives.iter().cloned().fold(f64::MIN, f64::max);
    let min_obj = objectives.iter().cloned().fold(f64::MAX, f64::min);

    IlluminationTelemetry {
        coverage: n,
        qd_score: front.iter().map(|c| c.objective * c.profile.diversity_p).sum(),
        objective_spread: max_obj - min_obj,
        average_novelty: front.iter().map(|c| c.profile.novelty_at_context).sum::<f64>() / n,
        average_diversity: front.iter().map(|c| c.profile.diversity_p).sum::<f64>() / n,
    }
}

fn candidate(id: &str, r_eff: f64, use_value: f64) -> NqdCandidate {
    NqdCandidate {
        id: id.to_string(),
        objective: r_eff,
        r_eff,
        schema_valid: true,
        profile: CreativityProfile {
            novelty_at_context: 0.5,
            use_value,
            surprise: 0.0,
            constraint_fit: 1.0,
            diversity_p: 0.5,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn functional_scenario_4_pareto_front_all_mutually_non_dominating() {
        let candidates = vec![
            candidate("a", 0.9, 0.1),
            candidate("b", 0.8, 0.2),
            candidate("c", 0.7, 0.3),
        ];
        let archive = select(candidates, NqdSelectorConfig::default());
        assert_eq!(archive.pareto_front.len(), 3);
        assert!(archive.dominated.is_empty());
        assert_eq!(archive.selected_winner.as_deref(), Some("c"));
    }

    #[test]
    fn unit_dominance_is_transitive() {
        let a = candidate("a", 0.9, 0.3);
        let b = candidate("b", 0.8, 0.2);
        let c = candidate("c", 0.7, 0.1);
        assert!(dominates(&a, &b));
        assert!(dominates(&b, &c));
        assert!(dominates(&a, &c));
    }

    #[test]
    fn unit_ineligible_candidates_are_excluded_from_front() {
        let mut low = candidate("low", 0.5, -0.5);
        low.profile.constraint_fit = 0.0;
        let candidates = vec![candidate("a", 0.9, 0.1), low];
        let archive = select(candidates, NqdSelectorConfig::default());
        assert_eq!(archive.ineligible.len(), 1);
        assert_eq!(archive.ineligible[0].id, "low");
    }

    #[test]
    fn unit_front_pruned_by_use_value_when_oversized() {
        let candidates: Vec<_> = (0..5)
            .map(|i| candidate(&format!("c{i}"), 1.0 - i as f64 * 0.01, i as f64 * 0.1))
            .collect();
        let archive = select(
            candidates,
            NqdSelectorConfig {
                max_front_size: 2,
                ..NqdSelectorConfig::default()
            },
        );
        assert_eq!(archive.pareto_front.len(), 2);
    }
}
