use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{Task, TaskStatus};
use crate::error::{ServiceError, ServiceResult};
use crate::pipeline::AnalysisResult;

const CANCELLED_STEP: &str = "cancelled by user";
const FAILED_STEP: &str = "analysis failed";

struct TaskEntry {
    task: Task,
    cancel: CancellationToken,
    seq: u64,
}

/// In-memory task registry.
///
/// Every mutation happens under the map's per-entry lock, so readers see a
/// task either before or after a transition, never halfway through one.
/// Terminal states are sticky: progress updates, completion and failure are
/// ignored once a task has left `Processing`. A cancellation that lands
/// before the pipeline reports completion therefore wins.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: DashMap<String, TaskEntry>,
    next_seq: AtomicU64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new task in `Processing` state and return its id
    pub fn create(&self, filename: &str, model: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let task = Task {
            id: id.clone(),
            status: TaskStatus::Processing,
            progress: 0,
            current_step: "queued".to_string(),
            result: None,
            error: None,
            filename: filename.to_string(),
            model: model.to_string(),
            created_at: now,
            updated_at: now,
        };

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.tasks.insert(
            id.clone(),
            TaskEntry {
                task,
                cancel: CancellationToken::new(),
                seq,
            },
        );

        metrics::counter!("docent_tasks_created_total").increment(1);
        info!(task_id = %id, filename = %filename, model = %model, "Task created");
        id
    }

    /// Token signalled when the task is cancelled or deleted
    pub fn cancellation_token(&self, id: &str) -> ServiceResult<CancellationToken> {
        self.tasks
            .get(id)
            .map(|entry| entry.cancel.clone())
            .ok_or_else(|| not_found(id))
    }

    /// Record pipeline progress. Ignored for unknown or terminal tasks.
    ///
    /// Progress never moves backwards.
    pub fn update_progress(&self, id: &str, progress: u8, step: &str) {
        let Some(mut entry) = self.tasks.get_mut(id) else {
            return;
        };
        let task = &mut entry.task;
        if task.status.is_terminal() {
            return;
        }

        task.progress = task.progress.max(progress.min(100));
        task.current_step = step.to_string();
        task.updated_at = Utc::now();
        debug!(task_id = %id, progress = task.progress, step = %step, "Task progress");
    }

    /// Move a processing task to `Completed`.
    ///
    /// Returns `false` when the task is gone or already terminal, in which
    /// case the result is discarded.
    pub fn complete(&self, id: &str, result: AnalysisResult) -> bool {
        let Some(mut entry) = self.tasks.get_mut(id) else {
            return false;
        };
        let task = &mut entry.task;
        if task.status.is_terminal() {
            debug!(task_id = %id, status = %task.status, "Discarding result for finished task");
            return false;
        }

        task.status = TaskStatus::Completed;
        task.progress = 100;
        task.current_step = "complete".to_string();
        task.result = Some(result);
        task.updated_at = Utc::now();

        record_finished(TaskStatus::Completed);
        info!(task_id = %id, "Task completed");
        true
    }

    /// Move a processing task to `Failed`, resetting its progress.
    ///
    /// Returns `false` when the task is gone or already terminal.
    pub fn fail(&self, id: &str, message: String) -> bool {
        let Some(mut entry) = self.tasks.get_mut(id) else {
            return false;
        };
        let task = &mut entry.task;
        if task.status.is_terminal() {
            return false;
        }

        error!(task_id = %id, error = %message, "Task failed");
        task.status = TaskStatus::Failed;
        task.progress = 0;
        task.current_step = FAILED_STEP.to_string();
        task.error = Some(message);
        task.updated_at = Utc::now();

        record_finished(TaskStatus::Failed);
        true
    }

    /// Cancel a processing task and signal its pipeline to stop
    pub fn cancel(&self, id: &str) -> ServiceResult<Task> {
        let mut entry = self.tasks.get_mut(id).ok_or_else(|| not_found(id))?;
        if entry.task.status.is_terminal() {
            return Err(ServiceError::TaskNotCancellable {
                task_id: id.to_string(),
                status: entry.task.status,
            });
        }

        entry.cancel.cancel();
        let task = &mut entry.task;
        task.status = TaskStatus::Cancelled;
        task.current_step = CANCELLED_STEP.to_string();
        task.updated_at = Utc::now();

        record_finished(TaskStatus::Cancelled);
        info!(task_id = %id, progress = task.progress, "Task cancelled");
        Ok(task.clone())
    }

    /// Snapshot of one task
    pub fn get(&self, id: &str) -> ServiceResult<Task> {
        self.tasks
            .get(id)
            .map(|entry| entry.task.clone())
            .ok_or_else(|| not_found(id))
    }

    /// Snapshot of all tasks in creation order
    pub fn list(&self) -> Vec<Task> {
        let mut entries: Vec<(u64, Task)> = self
            .tasks
            .iter()
            .map(|entry| (entry.seq, entry.task.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, task)| task).collect()
    }

    /// Remove a task in any state. A running pipeline stops at its next checkpoint.
    pub fn delete(&self, id: &str) -> ServiceResult<()> {
        let (_, entry) = self.tasks.remove(id).ok_or_else(|| not_found(id))?;
        entry.cancel.cancel();
        info!(task_id = %id, status = %entry.task.status, "Task deleted");
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.tasks.len()
    }
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::TaskNotFound {
        task_id: id.to_string(),
    }
}

fn record_finished(status: TaskStatus) {
    metrics::counter!("docent_tasks_finished_total", "status" => status.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            filename: "doc.pdf".to_string(),
            text_content: "--- Page 1 ---\ntext".to_string(),
            analysis: "summary".to_string(),
            model_used: "gemma3:4b".to_string(),
            page_count: 1,
            task_id: None,
        }
    }

    #[test]
    fn test_create_starts_processing() {
        let registry = TaskRegistry::new();
        let id = registry.create("doc.pdf", "gemma3:4b");

        let task = registry.get(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Processing);
        assert_eq!(task.progress, 0);
        assert_eq!(task.filename, "doc.pdf");
        assert_eq!(task.model, "gemma3:4b");
        assert!(task.result.is_none());
        assert!(task.error.is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = TaskRegistry::new();
        let a = registry.create("a.pdf", "m");
        let b = registry.create("b.pdf", "m");
        assert_ne!(a, b);
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_progress_never_decreases() {
        let registry = TaskRegistry::new();
        let id = registry.create("doc.pdf", "m");

        registry.update_progress(&id, 40, "extracted page 2/4");
        registry.update_progress(&id, 30, "late update");

        let task = registry.get(&id).unwrap();
        assert_eq!(task.progress, 40);
        assert_eq!(task.current_step, "late update");
    }

    #[test]
    fn test_progress_is_frozen_once_terminal() {
        let registry = TaskRegistry::new();
        let id = registry.create("doc.pdf", "m");
        registry.update_progress(&id, 50, "halfway");
        registry.cancel(&id).unwrap();

        registry.update_progress(&id, 70, "still running");

        let task = registry.get(&id).unwrap();
        assert_eq!(task.progress, 50);
        assert_eq!(task.current_step, CANCELLED_STEP);
    }

    #[test]
    fn test_update_unknown_task_is_noop() {
        let registry = TaskRegistry::new();
        registry.update_progress("missing", 10, "step");
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_complete_stores_result() {
        let registry = TaskRegistry::new();
        let id = registry.create("doc.pdf", "m");

        assert!(registry.complete(&id, sample_result()));

        let task = registry.get(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 100);
        assert_eq!(task.result.unwrap().analysis, "summary");
    }

    #[test]
    fn test_fail_resets_progress() {
        let registry = TaskRegistry::new();
        let id = registry.create("doc.pdf", "m");
        registry.update_progress(&id, 60, "describing image 1/1 on page 3");

        assert!(registry.fail(&id, "model crashed".to_string()));

        let task = registry.get(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.progress, 0);
        assert_eq!(task.error.as_deref(), Some("model crashed"));
        assert!(task.result.is_none());
    }

    #[test]
    fn test_cancel_wins_over_late_completion() {
        let registry = TaskRegistry::new();
        let id = registry.create("doc.pdf", "m");
        let token = registry.cancellation_token(&id).unwrap();

        registry.cancel(&id).unwrap();
        assert!(token.is_cancelled());
        assert!(!registry.complete(&id, sample_result()));
        assert!(!registry.fail(&id, "late".to_string()));

        let task = registry.get(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
        assert!(task.result.is_none());
        assert!(task.error.is_none());
    }

    #[test]
    fn test_cancel_terminal_task_is_rejected() {
        let registry = TaskRegistry::new();
        let id = registry.create("doc.pdf", "m");
        registry.complete(&id, sample_result());

        let err = registry.cancel(&id).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::TaskNotCancellable {
                status: TaskStatus::Completed,
                ..
            }
        ));
        assert_eq!(registry.get(&id).unwrap().status, TaskStatus::Completed);

        let cancelled = registry.create("other.pdf", "m");
        registry.cancel(&cancelled).unwrap();
        assert!(registry.cancel(&cancelled).is_err());
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let registry = TaskRegistry::new();
        assert!(matches!(
            registry.get("nope"),
            Err(ServiceError::TaskNotFound { .. })
        ));
        assert!(matches!(
            registry.cancel("nope"),
            Err(ServiceError::TaskNotFound { .. })
        ));
        assert!(matches!(
            registry.delete("nope"),
            Err(ServiceError::TaskNotFound { .. })
        ));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_delete_removes_and_signals() {
        let registry = TaskRegistry::new();
        let id = registry.create("doc.pdf", "m");
        let token = registry.cancellation_token(&id).unwrap();

        registry.delete(&id).unwrap();

        assert!(token.is_cancelled());
        assert!(matches!(
            registry.get(&id),
            Err(ServiceError::TaskNotFound { .. })
        ));
        assert!(!registry.complete(&id, sample_result()));
    }

    #[test]
    fn test_list_in_creation_order() {
        let registry = TaskRegistry::new();
        let ids: Vec<String> = (0..5)
            .map(|i| registry.create(&format!("{}.pdf", i), "m"))
            .collect();
        registry.delete(&ids[2]).unwrap();

        let listed: Vec<String> = registry.list().into_iter().map(|t| t.id).collect();
        assert_eq!(listed, vec![ids[0].clone(), ids[1].clone(), ids[3].clone(), ids[4].clone()]);
    }

    #[test]
    fn test_concurrent_cancel_and_complete_settle_on_one_outcome() {
        for _ in 0..50 {
            let registry = Arc::new(TaskRegistry::new());
            let id = registry.create("doc.pdf", "m");

            let canceller = {
                let registry = registry.clone();
                let id = id.clone();
                std::thread::spawn(move || registry.cancel(&id).is_ok())
            };
            let completed = registry.complete(&id, sample_result());
            let cancelled = canceller.join().unwrap();

            assert!(completed ^ cancelled);
            let task = registry.get(&id).unwrap();
            if cancelled {
                assert_eq!(task.status, TaskStatus::Cancelled);
                assert!(task.result.is_none());
            } else {
                assert_eq!(task.status, TaskStatus::Completed);
                assert!(task.result.is_some());
            }
        }
    }
}
