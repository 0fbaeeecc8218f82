//! Events broadcast to `JobCoordinator::subscribe` receivers.

use serde::Serialize;

use crate::model::{JobId, JobStatus, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    TaskStarted {
        job_id: JobId,
        task_id: TaskId,
        video_id: String,
    },
    TaskFinished {
        job_id: JobId,
        task_id: TaskId,
        video_id: String,
        success: bool,
    },
    JobStatusChanged {
        job_id: JobId,
        status: JobStatus,
    },
    JobRemoved {
        job_id: JobId,
    },
}
