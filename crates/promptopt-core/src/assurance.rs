use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::judge::{CongruenceLevel, FormalityLevel};

/// Promotion gate computed by the assurance aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Pass,
    Degrade,
    Block,
    Abstain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssuranceStatus {
    Satisfied,
    Violated,
    Inconclusive,
}

/// Set-coverage scope object rather than a scalar, so future multi-type
/// domains extend without breaking the aggregator. The current domain has a
/// single claim type (`user_story`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageScope {
    pub covered_types: BTreeSet<String>,
    pub coverage_per_type: BTreeMap<String, f64>,
    pub total_coverage: f64,
}

impl CoverageScope {
    pub const SINGLE_CLAIM_TYPE: &'static str = "user_story";

    /// `totalCoverage = 1` if `r_eff > 0.5`, else `0` — single-type scope.
    pub fn from_r_eff(r_eff: f64) -> Self {
        let covered = r_eff > 0.5;
        let mut covered_types = BTreeSet::new();
        let mut coverage_per_type = BTreeMap::new();
        let total = if covered { 1.0 } else { 0.0 };
        if covered {
            covered_types.insert(Self::SINGLE_CLAIM_TYPE.to_string());
        }
        coverage_per_type.insert(Self::SINGLE_CLAIM_TYPE.to_string(), total);
        Self {
            covered_types,
            coverage_per_type,
            total_coverage: total,
        }
    }
}

/// Ordered improvement suggestions, one bucket per lever that could raise
/// the overall assurance verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovementPaths {
    pub raise_f: Vec<String>,
    pub raise_g: Vec<String>,
    pub raise_r: Vec<String>,
    pub raise_cl: Vec<String>,
}

/// Opaque audit record attached to an assurance verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssuranceCitation {
    pub hashes: Vec<String>,
    pub cutset_ids: Vec<String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssuranceTuple {
    pub f: FormalityLevel,
    pub g: CoverageScope,
    pub r_raw: f64,
    pub r_eff: f64,
    pub cl: CongruenceLevel,
    pub penalty_phi: f64,
    pub gate: Gate,
    pub status: AssuranceStatus,
    pub improvement_paths: ImprovementPaths,
    pub citation: AssuranceCitation,
}
