//! Row types returned by the stores.

use serde::Serialize;

use crate::model::{DownloadJob, JobId, JobStatus, TaskStatus};

/// Summary view used by `ytq status` without an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub id: JobId,
    pub config_name: String,
    pub status: JobStatus,
    pub task_count: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub created_at: i64,
    pub updated_at: i64,
}

impl JobSummary {
    pub fn of(job: &DownloadJob) -> Self {
        let count = |s: TaskStatus| job.tasks().iter().filter(|t| t.status == s).count();
        Self {
            id: job.id,
            config_name: job.config_name.clone(),
            status: job.status(),
            task_count: job.tasks().len(),
            succeeded: count(TaskStatus::Succeeded),
            failed: count(TaskStatus::Failed),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// A tracked YouTube channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub id: i64,
    pub channel_id: String,
    pub title: Option<String>,
    /// Downloader config for this channel's videos; None = scheduler default.
    pub config_name: Option<String>,
    pub added_at: i64,
}
