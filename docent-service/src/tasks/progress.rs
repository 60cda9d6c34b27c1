use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::TaskRegistry;
use crate::pipeline::ProgressSink;

/// Progress sink that writes into one registry entry
pub struct TaskProgress {
    tasks: Arc<TaskRegistry>,
    task_id: String,
    token: CancellationToken,
}

impl TaskProgress {
    pub fn new(tasks: Arc<TaskRegistry>, task_id: String, token: CancellationToken) -> Self {
        Self {
            tasks,
            task_id,
            token,
        }
    }
}

impl ProgressSink for TaskProgress {
    fn report(&self, progress: u8, step: &str) {
        self.tasks.update_progress(&self.task_id, progress, step);
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
