use std::collections::VecDeque;

use promptopt_core::{ContrastPair, EpicDistResult, PairTier, ScoredGenerateResult};

use crate::similarity::text_similarity;

#[derive(Debug, Clone, Copy)]
pub struct PairMinerConfig {
    pub min_sim: f64,
    pub min_delta: f64,
    pub max_pairs: usize,
    pub stratify_tiers: bool,
}

impl Default for PairMinerConfig {
    fn default() -> Self {
        Self {
            min_sim: 0.5,
            min_delta: 0.2,
            max_pairs: 20,
            stratify_tiers: false,
        }
    }
}

fn extracted_text(run: &ScoredGenerateResult) -> String {
    run.result
        .story_pack
        .as_ref()
        .map(|pack| pack.extract_text())
        .unwrap_or_default()
}

fn error_analysis(bad: &ScoredGenerateResult, good: &ScoredGenerateResult) -> Vec<String> {
    let mut reasons = Vec::new();
    if bad.result.story_pack.is_none() {
        reasons.push("schema invalid".to_string());
    }
    if let Some(pack) = &bad.result.story_pack {
        if pack.user_stories.is_empty() {
            reasons.push("no user stories produced".to_string());
        }
        if pack
            .user_stories
            .iter()
            .any(|s| s.acceptance_criteria.is_empty())
        {
            reasons.push("missing acceptance criteria".to_string());
        }
    }
    if bad.score < good.score * 0.5 {
        reasons.push("low coverage relative to paired run".to_string());
    }
    reasons
}

fn build_pair(epic_id: &str, a: &ScoredGenerateResult, b: &ScoredGenerateResult) -> Option<ContrastPair> {
    let (good, bad) = if a.score >= b.score { (a, b) } else { (b, a) };
    let sim = text_similarity(&extracted_text(a), &extracted_text(b));
    let delta = (good.score - bad.score).max(0.0);
    Some(ContrastPair {
        epic_id: epic_id.to_string(),
        good: good.clone(),
        bad: bad.clone(),
        similarity: sim,
        score_delta: delta,
        tier: PairTier::from_good_score(good.score),
        primary_metric: None,
        error_analysis: error_analysis(bad, good),
    })
}

/// Mines contrastive pairs within each epic, then sorts by descending
/// `score_delta` (ties broken by descending `similarity`) and truncates to
/// `max_pairs`. When `stratify_tiers` is set, the truncation round-robins
/// across HIGH/MEDIUM/LOW tiers instead of keeping only the highest-delta
/// tier.
pub fn mine_pairs(per_epic: &[EpicDistResult], config: PairMinerConfig) -> Vec<ContrastPair> {
    let mut candidates = Vec::new();

    for epic in per_epic {
        let runs = &epic.runs;
        for i in 0..runs.len() {
            for j in (i + 1)..runs.len() {
                let a = &runs[i];
                let b = &runs[j];
                if a.result.story_pack.is_none() && b.result.story_pack.is_none() {
                    continue;
                }
                let Some(pair) = build_pair(&epic.epic_id, a, b) else {
                    continue;
                };
                if pair.similarity >= config.min_sim && pair.score_delta >= config.min_delta {
                    candidates.push(pair);
                }
            }
        }
    }

    candidates.sort_by(|a, b| {
        b.score_delta
            .partial_cmp(&a.score_delta)
            .unwrap()
            .then_with(|| b.similarity.partial_cmp(&a.similarity).unwrap())
    });

    if config.stratify_tiers {
        stratify(candidates, config.max_pairs)
    } else {
        candidates.truncate(config.max_pairs);
        candidates
    }
}

fn stratify(sorted: Vec<ContrastPair>, max_pairs: usize) -> Vec<ContrastPair> {
    let mut by_tier: [VecDeque<ContrastPair>; 3] = Default::default();
    for pair in sorted {
        let idx = match pair.tier {
            PairTier::High => 0,
            PairTier::Medium => 1,
            PairTier::Low => 2,
        };
        by_tier[idx].push_back(pair);
    }

    let mut out = Vec::with_capacity(max_pairs);
    'fill: while out.len() < max_pairs {
        let mut progressed = false;
        for tier in by_tier.iter_mut() {
            if let Some(pair) = tier.pop_front() {
                out.push(pair);
                progressed = true;
                if out.len() == max_pairs {
                    break 'fill;
                }
            }
        }
        if !progressed {
            break;
        }
    }
    out
}
