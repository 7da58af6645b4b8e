use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A coarse-grained business requirement, the input to decomposition.
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epic {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserStory {
    pub title: String,
    pub role: String,
    pub want: String,
    pub benefit: String,
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub external_fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPack {
    pub epic_id: String,
    pub epic_title: String,
    pub user_stories: Vec<UserStory>,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub follow_ups: Vec<String>,
}

impl StoryPack {
    /// True when `epic_id` matches the requesting epic, the only
    /// cross-field invariant the shape carries.
    pub fn matches_epic(&self, epic: &Epic) -> bool {
        self.epic_id == epic.id
    }

    /// Concatenates story titles, narratives, and acceptance criteria only;
    /// external fields and commentary are discarded. Used as the basis for
    /// hash-vector similarity.
    pub fn extract_text(&self) -> String {
        let mut out = String::new();
        for story in &self.user_stories {
            out.push_str(&story.title);
            out.push(' ');
            out.push_str(&story.role);
            out.push(' ');
            out.push_str(&story.want);
            out.push(' ');
            out.push_str(&story.benefit);
            out.push(' ');
            for criterion in &story.acceptance_criteria {
                out.push_str(criterion);
                out.push(' ');
            }
        }
        out
    }
}

/// The outcome of one generator call at a given seed.
///
/// Invariant: `story_pack.is_none()` implies `error.is_some()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResult {
    pub seed: i64,
    pub story_pack: Option<StoryPack>,
    pub raw_text: String,
    #[serde(default)]
    pub tokens_used: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GenerateResult {
    pub fn ok(seed: i64, story_pack: StoryPack, raw_text: String, tokens_used: Option<u64>) -> Self {
        Self {
            seed,
            story_pack: Some(story_pack),
            raw_text,
            tokens_used,
            error: None,
        }
    }

    pub fn failed(seed: i64, raw_text: String, error: impl Into<String>) -> Self {
        Self {
            seed,
            story_pack: None,
            raw_text,
            tokens_used: None,
            error: Some(error.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.story_pack.is_some()
    }

    /// Structural invariant enforced at construction time: `story_pack ==
    /// None` must imply `error.is_some()`.
    pub fn check_invariant(&self) -> bool {
        self.story_pack.is_some() || self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_story() -> UserStory {
        UserStory {
            title: "Login".to_string(),
            role: "visitor".to_string(),
            want: "to sign in".to_string(),
            benefit: "access my account".to_string(),
            acceptance_criteria: vec!["Given a valid password, then I am logged in".to_string()],
            external_fields: BTreeMap::new(),
        }
    }

    #[test]
    fn unit_story_pack_matches_epic_checks_id_equality() {
        let epic = Epic {
            id: "E1".to_string(),
            title: "Auth".to_string(),
            description: "auth epic".to_string(),
            tags: vec![],
        };
        let pack = StoryPack {
            epic_id: "E1".to_string(),
            epic_title: "Auth".to_string(),
            user_stories: vec![sample_story()],
            assumptions: vec![],
            risks: vec![],
            follow_ups: vec![],
        };
        assert!(pack.matches_epic(&epic));

        let other = Epic { id: "E2".to_string(), ..epic };
        assert!(!pack.matches_epic(&other));
    }

    #[test]
    fn unit_extract_text_excludes_external_fields() {
        let mut story = sample_story();
        story
            .external_fields
            .insert("jira".to_string(), "PROJ-123".to_string());
        let pack = StoryPack {
            epic_id: "E1".to_string(),
            epic_title: "Auth".to_string(),
            user_stories: vec![story],
            assumptions: vec![],
            risks: vec![],
            follow_ups: vec![],
        };
        let text = pack.extract_text();
        assert!(text.contains("Login"));
        assert!(!text.contains("PROJ-123"));
    }

    #[test]
    fn unit_generate_result_failed_satisfies_invariant() {
        let result = GenerateResult::failed(1, "garbage".to_string(), "parse error");
        assert!(result.check_invariant());
        assert!(!result.is_valid());
    }

    #[test]
    fn unit_generate_result_ok_satisfies_invariant() {
        let pack = StoryPack {
            epic_id: "E1".to_string(),
            epic_title: "Auth".to_string(),
            user_stories: vec![sample_story()],
            assumptions: vec![],
            risks: vec![],
            follow_ups: vec![],
        };
        let result = GenerateResult::ok(1, pack, "{}".to_string(), Some(42));
        assert!(result.check_invariant());
        assert!(result.is_valid());
    }
}
