use std::collections::HashMap;
use std::sync::Mutex;

use promptopt_core::{OptimizationProgress, OptimizationRequestConfig, OptimizationResult, OptimizationTask};
use uuid::Uuid;

/// In-memory task registry keyed by a fresh UUID per optimization run.
/// Completed/failed tasks are reaped on a TTL rather than removed immediately
/// so a caller that polls slightly late can still read the terminal result.
pub struct TaskStore {
    tasks: Mutex<HashMap<String, OptimizationTask>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(&self, config: OptimizationRequestConfig, now: i64) -> String {
        let task_id = Uuid::new_v4().to_string();
        let task = OptimizationTask::new(task_id.clone(), config, now);
        self.tasks
            .lock()
            .expect("task store lock poisoned")
            .insert(task_id.clone(), task);
        task_id
    }

    pub fn get(&self, task_id: &str) -> Option<OptimizationTask> {
        self.tasks
            .lock()
            .expect("task store lock poisoned")
            .get(task_id)
            .cloned()
    }

    pub fn update_progress(&self, task_id: &str, progress: OptimizationProgress) {
        if let Some(task) = self.tasks.lock().expect("task store lock poisoned").get_mut(task_id) {
            task.update_progress(progress);
        }
    }

    pub fn complete(&self, task_id: &str, result: OptimizationResult, now: i64) {
        if let Some(task) = self.tasks.lock().expect("task store lock poisoned").get_mut(task_id) {
            task.complete(result, now);
        }
    }

    pub fn fail(&self, task_id: &str, error: impl Into<String>, now: i64) {
        if let Some(task) = self.tasks.lock().expect("task store lock poisoned").get_mut(task_id) {
            task.fail(error, now);
        }
    }

    /// Removes every terminal task whose `completed_at` is at least
    /// `reap_after_secs` in the past. Returns the number of tasks removed.
    pub fn reap_expired(&self, now: i64, reap_after_secs: i64) -> usize {
        let mut tasks = self.tasks.lock().expect("task store lock poisoned");
        let before = tasks.len();
        tasks.retain(|_, task| !task.is_reapable(now, reap_after_secs));
        before - tasks.len()
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use promptopt_core::TaskStatus;

    use super::*;

    fn config() -> OptimizationRequestConfig {
        OptimizationRequestConfig {
            epics: vec![],
            max_iterations: 5,
        }
    }

    #[test]
    fn unit_create_then_get_returns_pending_task() {
        let store = TaskStore::new();
        let task_id = store.create(config(), 0);
        let task = store.get(&task_id).expect("task exists");
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn unit_get_unknown_task_returns_none() {
        let store = TaskStore::new();
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn unit_complete_then_reap_after_ttl_removes_task() {
        let store = TaskStore::new();
        let task_id = store.create(config(), 0);
        store.complete(
            &task_id,
            OptimizationResult {
                iterations_completed: 1,
                final_objective: 0.5,
                promotions: 0,
                terminal_reason: "done".to_string(),
            },
            100,
        );
        assert_eq!(store.reap_expired(200, 3_600), 0);
        assert_eq!(store.reap_expired(10_000, 3_600), 1);
        assert!(store.get(&task_id).is_none());
    }
}
