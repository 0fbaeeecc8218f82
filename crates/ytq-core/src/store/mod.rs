//! Persistence: the job store and the tracked-channel store.
//!
//! `SqliteStore` (sqlx) is the system of record across restarts; `MemoryStore`
//! backs tests and one-shot runs that don't need history.

mod memory;
mod sqlite;
mod types;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{DownloadJob, JobId, TaskId};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{Channel, JobSummary};

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or update a job together with its full task list.
    async fn save_job(&self, job: &DownloadJob) -> Result<()>;

    async fn find_job(&self, id: JobId) -> Result<Option<DownloadJob>>;

    /// Jobs that are PENDING or RUNNING, oldest first.
    async fn find_unfinished_jobs(&self) -> Result<Vec<DownloadJob>>;

    /// Delete a job and its tasks. Returns false if it did not exist.
    async fn delete_job(&self, id: JobId) -> Result<bool>;

    /// Delete a single task. Returns false if it did not exist.
    async fn delete_task(&self, id: TaskId) -> Result<bool>;

    /// Job owning `task_id`, if any.
    async fn find_job_id_for_task(&self, task_id: TaskId) -> Result<Option<JobId>>;

    /// All jobs, newest first.
    async fn list_jobs(&self) -> Result<Vec<JobSummary>>;

    /// Remove every row from every table.
    async fn clean_tables(&self) -> Result<()>;

    /// Reset autoincrement counters.
    async fn reset_sequence(&self) -> Result<()>;
}

#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Track a channel. Adding a tracked channel again updates its title and config.
    async fn add_channel(
        &self,
        channel_id: &str,
        title: Option<&str>,
        config_name: Option<&str>,
    ) -> Result<Channel>;

    async fn remove_channel(&self, channel_id: &str) -> Result<bool>;

    /// Tracked channels in insertion order.
    async fn list_channels(&self) -> Result<Vec<Channel>>;

    async fn is_seen(&self, channel_id: &str, video_id: &str) -> Result<bool>;

    async fn mark_seen(&self, channel_id: &str, video_ids: &[String]) -> Result<()>;
}
