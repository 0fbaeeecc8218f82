//! Worker pool callbacks: task state transitions driven by the workers.

use async_trait::async_trait;

use super::{Inner, JobEvent};
use crate::model::{DownloadResult, TaskSpec};
use crate::pool::TaskCallback;

const CANCELLED_BY_SHUTDOWN: &str = "worker pool shut down before the task started";

#[async_trait]
impl TaskCallback for Inner {
    async fn on_start(&self, task: &TaskSpec) -> bool {
        let Some(entry) = self.entry(task.job_id) else {
            tracing::debug!(task_id = %task.task_id, "job gone, skipping task");
            return false;
        };
        let mut state = entry.state.lock().await;
        if !self.is_tracked(task.job_id, &entry) {
            tracing::debug!(task_id = %task.task_id, "job removed, skipping task");
            return false;
        }
        if !state.job.mark_task_running(task.task_id) {
            tracing::debug!(task_id = %task.task_id, "task no longer queued, skipping");
            return false;
        }
        state.job.touch();
        if let Err(e) = self.store.save_job(&state.job).await {
            tracing::warn!(job_id = %task.job_id, "persist job failed: {:#}", e);
        }
        tracing::info!(job_id = %task.job_id, task_id = %task.task_id, video_id = %task.video_id, "task started");
        self.emit(JobEvent::TaskStarted {
            job_id: task.job_id,
            task_id: task.task_id,
            video_id: task.video_id.clone(),
        });
        true
    }

    async fn on_complete(&self, task: &TaskSpec, result: DownloadResult) {
        let Some(entry) = self.entry(task.job_id) else {
            tracing::info!(task_id = %task.task_id, "result for removed job discarded");
            return;
        };
        let mut state = entry.state.lock().await;
        if !self.is_tracked(task.job_id, &entry) {
            tracing::info!(task_id = %task.task_id, "result for removed job discarded");
            return;
        }
        if !state.job.record_result(task.task_id, &result) {
            tracing::info!(task_id = %task.task_id, "result for deleted task discarded");
            return;
        }
        match result.error_message() {
            None => tracing::info!(job_id = %task.job_id, task_id = %task.task_id, video_id = %task.video_id, "task succeeded"),
            Some(err) => tracing::warn!(job_id = %task.job_id, task_id = %task.task_id, video_id = %task.video_id, "task failed: {}", err),
        }
        self.emit(JobEvent::TaskFinished {
            job_id: task.job_id,
            task_id: task.task_id,
            video_id: task.video_id.clone(),
            success: result.success(),
        });
        self.settle(&entry, &mut state).await;
    }

    async fn on_cancelled(&self, task: &TaskSpec) {
        let Some(entry) = self.entry(task.job_id) else {
            return;
        };
        let mut state = entry.state.lock().await;
        if state.job.fail_task(task.task_id, CANCELLED_BY_SHUTDOWN) {
            self.emit(JobEvent::TaskFinished {
                job_id: task.job_id,
                task_id: task.task_id,
                video_id: task.video_id.clone(),
                success: false,
            });
            self.settle(&entry, &mut state).await;
        }
    }
}
