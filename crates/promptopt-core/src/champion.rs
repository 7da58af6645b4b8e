use serde::{Deserialize, Serialize};

use crate::patch::compose_effective_prompt;

/// Bound on retained history entries; the oldest is evicted once exceeded.
pub const CHAMPION_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChampionSnapshot {
    pub base: String,
    pub patch: String,
    pub composed: String,
    pub updated_at: i64,
}

/// Process-wide singleton. Mutated only by the Loop Orchestrator after a
/// promotion decision; `base` is immutable for the lifetime of a run, only
/// `patch` changes on promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Champion {
    pub base: String,
    pub patch: String,
    pub composed: String,
    pub updated_at: i64,
    pub history: Vec<ChampionSnapshot>,
}

impl Champion {
    pub fn seeded(base: impl Into<String>, patch: impl Into<String>, now: i64) -> Self {
        let base = base.into();
        let patch = patch.into();
        let composed = compose_effective_prompt(&base, &patch);
        Self {
            base,
            patch,
            composed,
            updated_at: now,
            history: Vec::new(),
        }
    }

    /// Replaces `patch` with `new_patch`, recomposes `composed`, appends the
    /// previous snapshot to `history`, and evicts the oldest entry once the
    /// history exceeds [`CHAMPION_HISTORY_LIMIT`].
    pub fn promote(&mut self, new_patch: String, now: i64) {
        let previous = ChampionSnapshot {
            base: self.base.clone(),
            patch: self.patch.clone(),
            composed: self.composed.clone(),
            updated_at: self.updated_at,
        };
        self.history.push(previous);
        if self.history.len() > CHAMPION_HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.patch = new_patch;
        self.composed = compose_effective_prompt(&self.base, &self.patch);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_promote_appends_history_and_recomposes() {
        let mut champion = Champion::seeded("base rules", "v1", 100);
        champion.promote("v2".to_string(), 200);
        assert_eq!(champion.patch, "v2");
        assert_eq!(champion.composed, "base rules\nv2");
        assert_eq!(champion.history.len(), 1);
        assert_eq!(champion.history[0].patch, "v1");
        assert_eq!(champion.updated_at, 200);
    }

    #[test]
    fn unit_history_evicts_oldest_beyond_limit() {
        let mut champion = Champion::seeded("base", "v0", 0);
        for i in 1..=(CHAMPION_HISTORY_LIMIT + 5) {
            champion.promote(format!("v{i}"), i as i64);
        }
        assert_eq!(champion.history.len(), CHAMPION_HISTORY_LIMIT);
        assert_eq!(champion.history[0].patch, "v5");
    }

    #[test]
    fn unit_round_trip_json_preserves_base_patch_composed() {
        let champion = Champion::seeded("base", "patch", 0);
        let json = serde_json::to_string(&champion).expect("serialize");
        let restored: Champion = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored.base, champion.base);
        assert_eq!(restored.patch, champion.patch);
        assert_eq!(restored.composed, champion.composed);
    }
}
