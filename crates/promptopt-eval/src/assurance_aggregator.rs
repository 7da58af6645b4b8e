use chrono::Utc;
use promptopt_core::{
    AssuranceCitation, AssuranceStatus, AssuranceTuple, CongruenceLevel, CoverageScope,
    FormalityLevel, Gate, ImprovementPaths, JudgeOutput,
};

use crate::judge_panel::congruence;

/// Weakest-link aggregation: `R_eff = max(0, min(R_i) - Φ(CL))`. Averaging
/// disagreeing judges would inflate confidence; this rule explicitly
/// penalizes both the worst judge and their disagreement. Ordinals (`F`,
/// `CL`) are never averaged, only `min`/thresholded.
pub fn aggregate(judges: &[JudgeOutput], formalities: &[FormalityLevel]) -> AssuranceTuple {
    let cl = congruence(judges);
    let phi = cl.phi();
    let r_raw = judges
        .iter()
        .map(|j| j.overall_score)
        .fold(f64::MAX, f64::min)
        .max(0.0);
    let r_eff = (r_raw - phi).max(0.0);
    let f_eff = formalities.iter().copied().min().unwrap_or(FormalityLevel::Informal);
    let g = CoverageScope::from_r_eff(r_eff);

    let gate = if r_eff >= 0.7 {
        Gate::Pass
    } else if r_eff <= 0.3 {
        Gate::Block
    } else {
        Gate::Degrade
    };
    let status = match gate {
        Gate::Pass => AssuranceStatus::Satisfied,
        Gate::Block => AssuranceStatus::Violated,
        _ => AssuranceStatus::Inconclusive,
    };

    let improvement_paths = improvement_paths_for(judges, r_raw, cl, f_eff);

    AssuranceTuple {
        f: f_eff,
        g,
        r_raw,
        r_eff,
        cl,
        penalty_phi: phi,
        gate,
        status,
        improvement_paths,
        citation: AssuranceCitation {
            hashes: judges.iter().map(|j| j.judge_id.clone()).collect(),
            cutset_ids: cutset(judges, r_raw),
            timestamp: Utc::now().timestamp(),
        },
    }
}

/// The "cutset": which judge(s) pinned `R_raw` at its minimum.
fn cutset(judges: &[JudgeOutput], r_raw: f64) -> Vec<String> {
    judges
        .iter()
        .filter(|j| (j.overall_score - r_raw).abs() < 1e-9)
        .map(|j| j.judge_id.clone())
        .collect()
}

fn improvement_paths_for(
    judges: &[JudgeOutput],
    r_raw: f64,
    cl: CongruenceLevel,
    f_eff: FormalityLevel,
) -> ImprovementPaths {
    let mut paths = ImprovementPaths::default();
    if cl != CongruenceLevel::Verified {
        paths
            .raise_cl
            .push("increase judge agreement (tighten rubric or add a tie-breaking judge)".to_string());
    }
    if r_raw < 0.7 {
        for judge in cutset(judges, r_raw) {
            paths.raise_r.push(format!("improve output quality to raise {judge}'s score"));
        }
    }
    if f_eff != FormalityLevel::ProofGrade {
        paths
            .raise_f
            .push("increase structural rigor of acceptance criteria".to_string());
    }
    paths
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn judge(id: &str, score: f64) -> JudgeOutput {
        JudgeOutput {
            judge_id: id.to_string(),
            per_criterion: BTreeMap::new(),
            overall_score: score,
            latency_ms: 0,
            timestamp: 0,
        }
    }

    #[test]
    fn functional_scenario_2_congruence_and_weakest_link() {
        let judges = vec![judge("a", 0.95), judge("b", 0.50), judge("c", 0.70)];
        let formalities = vec![
            FormalityLevel::Formalizable,
            FormalityLevel::Structured,
            FormalityLevel::Formalizable,
        ];
        let tuple = aggregate(&judges, &formalities);
        assert_eq!(tuple.cl, CongruenceLevel::WeakGuess);
        assert!((tuple.penalty_phi - 0.30).abs() < 1e-9);
        assert!((tuple.r_raw - 0.50).abs() < 1e-9);
        assert!((tuple.r_eff - 0.20).abs() < 1e-9);
        assert_eq!(tuple.f, FormalityLevel::Structured);
        assert_eq!(tuple.gate, Gate::Block);
        assert_eq!(tuple.status, AssuranceStatus::Violated);
        assert!(!tuple.improvement_paths.raise_cl.is_empty());
    }

    #[test]
    fn unit_r_eff_never_exceeds_min_judge_score() {
        let judges = vec![judge("a", 0.6), judge("b", 0.65)];
        let tuple = aggregate(&judges, &[FormalityLevel::Structured, FormalityLevel::Structured]);
        assert!(tuple.r_eff <= judges.iter().map(|j| j.overall_score).fold(f64::MAX, f64::min));
    }

    #[test]
    fn unit_high_agreement_high_scores_pass_gate() {
        let judges = vec![judge("a", 0.9), judge("b", 0.92), judge("c", 0.88)];
        let tuple = aggregate(&judges, &[FormalityLevel::ProofGrade; 3]);
        assert_eq!(tuple.gate, Gate::Pass);
        assert_eq!(tuple.status, AssuranceStatus::Satisfied);
    }
}
