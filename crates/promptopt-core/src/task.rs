use serde::{Deserialize, Serialize};

use crate::epic::Epic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Per-request knobs for one optimization run; distinct from the
/// process-wide [`crate::config::EngineConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRequestConfig {
    pub epics: Vec<Epic>,
    pub max_iterations: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OptimizationProgress {
    pub iteration: u64,
    pub max_iterations: u64,
    pub step: OptimizationStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStep {
    #[default]
    InitChampion,
    EvaluateChampion,
    MinePairs,
    GeneratePatches,
    Tournament,
    PromotionDecision,
    MetaEvolution,
    Checkpoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub iterations_completed: u64,
    pub final_objective: f64,
    pub promotions: u64,
    pub terminal_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationTask {
    pub task_id: String,
    pub status: TaskStatus,
    pub config: OptimizationRequestConfig,
    pub progress: OptimizationProgress,
    pub history: Vec<OptimizationProgress>,
    pub result: Option<OptimizationResult>,
    pub error: Option<String>,
    pub started_at: i64,
    pub completed_at: Option<i64>,
}

impl OptimizationTask {
    pub fn new(task_id: String, config: OptimizationRequestConfig, now: i64) -> Self {
        Self {
            task_id,
            status: TaskStatus::Pending,
            progress: OptimizationProgress {
                iteration: 0,
                max_iterations: config.max_iterations,
                step: OptimizationStep::InitChampion,
            },
            config,
            history: Vec::new(),
            result: None,
            error: None,
            started_at: now,
            completed_at: None,
        }
    }

    pub fn update_progress(&mut self, progress: OptimizationProgress) {
        self.status = TaskStatus::Running;
        self.history.push(self.progress);
        self.progress = progress;
    }

    pub fn complete(&mut self, result: OptimizationResult, now: i64) {
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.completed_at = Some(now);
    }

    pub fn fail(&mut self, error: impl Into<String>, now: i64) {
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(now);
    }

    pub fn is_reapable(&self, now: i64, reap_after_secs: i64) -> bool {
        match self.completed_at {
            Some(completed_at) => self.status.is_terminal() && now - completed_at >= reap_after_secs,
            None => false,
        }
    }
}
