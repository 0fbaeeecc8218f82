//! `DownloadJob` owns its tasks by value; tasks point back by `JobId` only.
//!
//! Job status is never set directly. It moves PENDING → RUNNING through
//! `start()` and is re-derived from task statuses by `refresh_status()`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::result::DownloadResult;
use super::status::{aggregate, JobStatus, TaskStatus};
use super::{unix_timestamp, JobId, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move job from {from} to {to}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    pub id: TaskId,
    pub job_id: JobId,
    pub video_id: String,
    pub status: TaskStatus,
    pub file_path: Option<PathBuf>,
    pub file_size: Option<u64>,
    pub error_message: Option<String>,
    pub warnings: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DownloadTask {
    fn new(job_id: JobId, video_id: String, now: i64) -> Self {
        Self {
            id: TaskId::new_v4(),
            job_id,
            video_id,
            status: TaskStatus::Queued,
            file_path: None,
            file_size: None,
            error_message: None,
            warnings: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadJob {
    pub id: JobId,
    pub config_name: String,
    status: JobStatus,
    tasks: Vec<DownloadTask>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DownloadJob {
    /// New PENDING job with one QUEUED task per video id, in the given order.
    pub fn new(config_name: impl Into<String>, video_ids: Vec<String>) -> Self {
        let id = JobId::new_v4();
        let now = unix_timestamp();
        let tasks = video_ids
            .into_iter()
            .map(|video_id| DownloadTask::new(id, video_id, now))
            .collect();
        Self {
            id,
            config_name: config_name.into(),
            status: JobStatus::Pending,
            tasks,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a job loaded from the store.
    pub fn restore(
        id: JobId,
        config_name: String,
        status: JobStatus,
        tasks: Vec<DownloadTask>,
        created_at: i64,
        updated_at: i64,
    ) -> Self {
        Self {
            id,
            config_name,
            status,
            tasks,
            created_at,
            updated_at,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn tasks(&self) -> &[DownloadTask] {
        &self.tasks
    }

    pub fn task(&self, task_id: TaskId) -> Option<&DownloadTask> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    fn task_mut(&mut self, task_id: TaskId) -> Option<&mut DownloadTask> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }

    /// Ids of tasks that are still waiting for a worker.
    pub fn queued_task_ids(&self) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Queued)
            .map(|t| t.id)
            .collect()
    }

    pub fn failed_video_ids(&self) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .map(|t| t.video_id.clone())
            .collect()
    }

    /// PENDING → RUNNING.
    pub fn start(&mut self) -> Result<(), InvalidTransition> {
        if self.status != JobStatus::Pending {
            return Err(InvalidTransition {
                from: self.status,
                to: JobStatus::Running,
            });
        }
        self.status = JobStatus::Running;
        Ok(())
    }

    /// QUEUED → RUNNING. Returns false if the task is gone or not queued.
    pub fn mark_task_running(&mut self, task_id: TaskId) -> bool {
        let now = unix_timestamp();
        match self.task_mut(task_id) {
            Some(task) if task.status == TaskStatus::Queued => {
                task.status = TaskStatus::Running;
                task.updated_at = now;
                true
            }
            _ => false,
        }
    }

    /// Record a worker result on a non-terminal task. Returns false if the task
    /// is gone or already terminal (the result is discarded).
    pub fn record_result(&mut self, task_id: TaskId, result: &DownloadResult) -> bool {
        let now = unix_timestamp();
        let Some(task) = self.task_mut(task_id) else {
            return false;
        };
        if task.status.is_terminal() {
            return false;
        }
        if result.success() {
            task.status = TaskStatus::Succeeded;
            task.file_path = result.file_path().map(|p| p.to_path_buf());
            task.file_size = result.file_size();
            task.error_message = None;
        } else {
            task.status = TaskStatus::Failed;
            task.file_path = None;
            task.file_size = None;
            task.error_message = result.error_message().map(str::to_string);
        }
        task.warnings.extend(result.warnings.iter().cloned());
        task.updated_at = now;
        true
    }

    /// Move a non-terminal task to FAILED with `reason`. Returns false if the
    /// task is gone or already terminal.
    pub fn fail_task(&mut self, task_id: TaskId, reason: &str) -> bool {
        let now = unix_timestamp();
        match self.task_mut(task_id) {
            Some(task) if !task.status.is_terminal() => {
                task.status = TaskStatus::Failed;
                task.error_message = Some(reason.to_string());
                task.updated_at = now;
                true
            }
            _ => false,
        }
    }

    pub fn remove_task(&mut self, task_id: TaskId) -> Option<DownloadTask> {
        let idx = self.tasks.iter().position(|t| t.id == task_id)?;
        Some(self.tasks.remove(idx))
    }

    /// Re-derive a RUNNING job's status from its tasks. Returns true if it changed.
    ///
    /// PENDING and terminal jobs are left alone.
    pub fn refresh_status(&mut self) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        match aggregate(self.tasks.iter().map(|t| t.status)) {
            Some(next) => {
                self.status = next;
                true
            }
            None => false,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = unix_timestamp();
    }
}
