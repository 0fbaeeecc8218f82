//! Hooks the pool calls around each task.

use async_trait::async_trait;

use crate::model::{DownloadResult, TaskSpec};

#[async_trait]
pub trait TaskCallback: Send + Sync {
    /// Called on the worker right before execution. Returning false skips the task.
    async fn on_start(&self, _task: &TaskSpec) -> bool {
        true
    }

    async fn on_complete(&self, task: &TaskSpec, result: DownloadResult);

    /// Called for queued tasks dropped by `shutdown(drain = false)`.
    async fn on_cancelled(&self, _task: &TaskSpec) {}
}
