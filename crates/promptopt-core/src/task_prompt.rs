use serde::{Deserialize, Serialize};

/// A candidate prompt in the task-prompt population: an immutable `base`
/// plus an evolving `patch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPrompt {
    pub id: String,
    pub base: String,
    pub patch: String,
    pub fitness: f64,
    pub generation: u64,
    pub mutation_id: Option<String>,
    pub parent_id: Option<String>,
}

impl TaskPrompt {
    pub fn composed(&self) -> String {
        crate::patch::compose_effective_prompt(&self.base, &self.patch)
    }
}
