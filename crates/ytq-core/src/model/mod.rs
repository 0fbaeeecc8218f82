//! Job, task and result types shared by the pool, the coordinator and the store.

mod job;
mod progress;
mod result;
mod status;

use std::time::{SystemTime, UNIX_EPOCH};

pub use job::{DownloadJob, DownloadTask, InvalidTransition};
pub use progress::TaskProgress;
pub use result::{DownloadResult, Outcome, TaskSpec};
pub use status::{aggregate, JobStatus, TaskStatus};

/// Job identifier (v4 UUID).
pub type JobId = uuid::Uuid;

/// Task identifier (v4 UUID).
pub type TaskId = uuid::Uuid;

/// Current time as Unix seconds (job/task timestamps).
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
