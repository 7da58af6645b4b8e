use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchCandidate {
    pub id: String,
    pub patch: String,
    pub rationale: String,
    pub targeted_issue: String,
}

/// The separator chosen between `base` and `patch` when composing the
/// effective prompt. The spec leaves the exact choice open; a blank line is
/// used consistently throughout this engine.
pub const EFFECTIVE_PROMPT_SEPARATOR: &str = "\n";

/// The effective prompt is `base ∥ separator ∥ patch`.
pub fn compose_effective_prompt(base: &str, patch: &str) -> String {
    if patch.is_empty() {
        return base.to_string();
    }
    format!("{base}{EFFECTIVE_PROMPT_SEPARATOR}{patch}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_compose_effective_prompt_concatenates_with_separator() {
        let composed = compose_effective_prompt("base rules", "also do X");
        assert_eq!(composed, "base rules\nalso do X");
    }

    #[test]
    fn unit_compose_effective_prompt_with_empty_patch_returns_base() {
        assert_eq!(compose_effective_prompt("base rules", ""), "base rules");
    }
}
