use std::collections::BTreeSet;

use promptopt_core::{Criterion, Epic, JudgeOutput, StoryPack};

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "with", "that", "this", "from", "have",
    "they", "will", "can", "all", "any", "our", "your", "their", "into", "when", "then", "than",
    "who", "what", "how", "out", "use", "per", "via", "may", "its",
];

fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() > 2 && !STOPWORDS.contains(token))
        .map(str::to_string)
        .collect()
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeuristicScores {
    pub keyword_coverage: f64,
    pub invest_composite: f64,
    pub acceptance_criteria_quality: f64,
    pub duplication: f64,
    pub count_band: f64,
    pub overall: f64,
}

/// `countBand`: `|stories| ∈ [4,8] → 1.0`; `∈ {3,9} → 0.7`; otherwise `0.4`.
pub fn count_band(story_count: usize) -> f64 {
    if (4..=8).contains(&story_count) {
        1.0
    } else if story_count == 3 || story_count == 9 {
        0.7
    } else {
        0.4
    }
}

fn keyword_coverage(epic: &Epic, story_pack: &StoryPack) -> f64 {
    let epic_text = format!("{} {}", epic.title, epic.description);
    let epic_tokens = tokenize(&epic_text);
    if epic_tokens.is_empty() {
        return 0.0;
    }
    let pack_tokens = tokenize(&story_pack.extract_text());
    let overlap = epic_tokens.intersection(&pack_tokens).count();
    overlap as f64 / epic_tokens.len() as f64
}

fn invest_composite(judges: &[JudgeOutput]) -> f64 {
    if judges.is_empty() {
        return 0.0;
    }
    let invest_weight_total: f64 = Criterion::ALL
        .iter()
        .filter(|c| c.is_invest())
        .map(|c| c.weight())
        .sum();
    if invest_weight_total <= 0.0 {
        return 0.0;
    }
    let per_judge: Vec<f64> = judges
        .iter()
        .map(|judge| {
            Criterion::ALL
                .iter()
                .filter(|c| c.is_invest())
                .filter_map(|c| judge.per_criterion.get(c).map(|(score, _)| c.weight() * score))
                .sum::<f64>()
                / invest_weight_total
        })
        .collect();
    per_judge.iter().sum::<f64>() / per_judge.len() as f64
}

fn acceptance_criteria_quality(judges: &[JudgeOutput]) -> f64 {
    let scores: Vec<f64> = judges.iter().filter_map(JudgeOutput::formality_score).collect();
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

fn duplication(story_pack: &StoryPack) -> f64 {
    let sets: Vec<BTreeSet<String>> = story_pack
        .user_stories
        .iter()
        .map(|story| story.acceptance_criteria.iter().flat_map(|c| tokenize(c)).collect())
        .collect();
    if sets.len() < 2 {
        return 1.0;
    }
    let mut max_sim = 0.0_f64;
    for i in 0..sets.len() {
        for j in (i + 1)..sets.len() {
            max_sim = max_sim.max(jaccard(&sets[i], &sets[j]));
        }
    }
    1.0 - max_sim
}

/// Scores a story pack against the fixed heuristic rubric. Returns all-zero
/// scores when `story_pack` is `None` (schema invalid).
pub fn score_heuristics(
    epic: &Epic,
    story_pack: Option<&StoryPack>,
    judges: &[JudgeOutput],
) -> HeuristicScores {
    let Some(story_pack) = story_pack else {
        return HeuristicScores::default();
    };

    let keyword_coverage = keyword_coverage(epic, story_pack);
    let invest = invest_composite(judges);
    let ac_quality = acceptance_criteria_quality(judges);
    let dup = duplication(story_pack);
    let band = count_band(story_pack.user_stories.len());

    let overall =
        (0.25 * keyword_coverage + 0.30 * invest + 0.30 * ac_quality + 0.10 * dup + 0.05 * band)
            .clamp(0.0, 1.0);

    HeuristicScores {
        keyword_coverage,
        invest_composite: invest,
        acceptance_criteria_quality: ac_quality,
        duplication: dup,
        count_band: band,
        overall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_count_band_boundary_behaviors() {
        assert_eq!(count_band(4), 1.0);
        assert_eq!(count_band(8), 1.0);
        assert_eq!(count_band(3), 0.7);
        assert_eq!(count_band(9), 0.7);
        assert_eq!(count_band(0), 0.4);
        assert_eq!(count_band(20), 0.4);
    }

    #[test]
    fn unit_score_heuristics_returns_zero_when_pack_is_none() {
        let epic = Epic {
            id: "E1".to_string(),
            title: "Checkout".to_string(),
            description: "allow purchase".to_string(),
            tags: vec![],
        };
        let scores = score_heuristics(&epic, None, &[]);
        assert_eq!(scores.overall, 0.0);
    }

    #[test]
    fn unit_duplication_is_one_for_single_story() {
        let pack = StoryPack {
            epic_id: "E1".to_string(),
            epic_title: "Checkout".to_string(),
            user_stories: vec![promptopt_core::UserStory {
                title: "t".to_string(),
                role: "r".to_string(),
                want: "w".to_string(),
                benefit: "b".to_string(),
                acceptance_criteria: vec!["Given X then Y".to_string()],
                external_fields: Default::default(),
            }],
            assumptions: vec![],
            risks: vec![],
            follow_ups: vec![],
        };
        assert_eq!(duplication(&pack), 1.0);
    }

    #[test]
    fn unit_duplication_detects_identical_acceptance_criteria() {
        let story = promptopt_core::UserStory {
            title: "t".to_string(),
            role: "r".to_string(),
            want: "w".to_string(),
            benefit: "b".to_string(),
            acceptance_criteria: vec!["Given item added then cart updated".to_string()],
            external_fields: Default::default(),
        };
        let pack = StoryPack {
            epic_id: "E1".to_string(),
            epic_title: "Checkout".to_string(),
            user_stories: vec![story.clone(), story],
            assumptions: vec![],
            risks: vec![],
            follow_ups: vec![],
        };
        assert_eq!(duplication(&pack), 0.0);
    }
}
