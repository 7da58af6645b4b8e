use promptopt_core::{Epic, StoryPack};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("raw output was not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),
    #[error("story pack epicId did not match the requesting epic")]
    EpicMismatch,
    #[error("story pack has no user stories")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct RawStoryPack {
    #[serde(rename = "epicId")]
    epic_id: String,
    #[serde(rename = "epicTitle")]
    epic_title: String,
    #[serde(rename = "userStories")]
    user_stories: Vec<RawUserStory>,
    #[serde(default)]
    assumptions: Vec<String>,
    #[serde(default)]
    risks: Vec<String>,
    #[serde(rename = "followUps", default)]
    follow_ups: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawUserStory {
    title: String,
    role: String,
    want: String,
    benefit: String,
    #[serde(rename = "acceptanceCriteria", default)]
    acceptance_criteria: Vec<String>,
    #[serde(rename = "externalFields", default)]
    external_fields: std::collections::BTreeMap<String, String>,
}

/// Parses and validates the raw generator output against the fixed
/// StoryPack shape. Invalid structure (malformed JSON, mismatched
/// `epicId`, or zero stories) is surfaced as [`SchemaError`] so the caller
/// can set `schema_valid = 0` and drop the pack.
pub fn parse_story_pack(raw_text: &str, epic: &Epic) -> Result<StoryPack, SchemaError> {
    let raw: RawStoryPack = serde_json::from_str(raw_text)?;
    if raw.epic_id != epic.id {
        return Err(SchemaError::EpicMismatch);
    }
    if raw.user_stories.is_empty() {
        return Err(SchemaError::Empty);
    }

    Ok(StoryPack {
        epic_id: raw.epic_id,
        epic_title: raw.epic_title,
        user_stories: raw
            .user_stories
            .into_iter()
            .map(|s| promptopt_core::UserStory {
                title: s.title,
                role: s.role,
                want: s.want,
                benefit: s.benefit,
                acceptance_criteria: s.acceptance_criteria,
                external_fields: s.external_fields,
            })
            .collect(),
        assumptions: raw.assumptions,
        risks: raw.risks,
        follow_ups: raw.follow_ups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epic() -> Epic {
        Epic {
            id: "E1".to_string(),
            title: "Checkout".to_string(),
            description: "d".to_string(),
            tags: vec![],
        }
    }

    #[test]
    fn unit_parse_story_pack_rejects_malformed_json() {
        let error = parse_story_pack("not json", &epic()).expect_err("malformed");
        assert!(matches!(error, SchemaError::NotJson(_)));
    }

    #[test]
    fn unit_parse_story_pack_rejects_epic_mismatch() {
        let raw = r#"{"epicId":"OTHER","epicTitle":"x","userStories":[{"title":"t","role":"r","want":"w","benefit":"b","acceptanceCriteria":[]}]}"#;
        let error = parse_story_pack(raw, &epic()).expect_err("mismatch");
        assert!(matches!(error, SchemaError::EpicMismatch));
    }

    #[test]
    fn unit_parse_story_pack_rejects_empty_stories() {
        let raw = r#"{"epicId":"E1","epicTitle":"x","userStories":[]}"#;
        let error = parse_story_pack(raw, &epic()).expect_err("empty");
        assert!(matches!(error, SchemaError::Empty));
    }

    #[test]
    fn unit_parse_story_pack_accepts_well_formed_payload() {
        let raw = r#"{"epicId":"E1","epicTitle":"Checkout","userStories":[{"title":"t","role":"shopper","want":"w","benefit":"b","acceptanceCriteria":["c1"]}]}"#;
        let pack = parse_story_pack(raw, &epic()).expect("valid");
        assert_eq!(pack.user_stories.len(), 1);
    }
}
