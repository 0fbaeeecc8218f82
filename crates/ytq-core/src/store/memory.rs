//! In-memory store with the same semantics as `SqliteStore`.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use super::{Channel, ChannelStore, JobStore, JobSummary};
use crate::model::{unix_timestamp, DownloadJob, JobId, JobStatus, TaskId};

#[derive(Default)]
struct State {
    jobs: HashMap<JobId, DownloadJob>,
    /// Insertion order, for stable "newest first" listings.
    job_order: Vec<JobId>,
    channels: BTreeMap<i64, Channel>,
    next_channel_id: i64,
    seen: HashSet<(String, String)>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn save_job(&self, job: &DownloadJob) -> Result<()> {
        let mut state = self.lock();
        if state.jobs.insert(job.id, job.clone()).is_none() {
            state.job_order.push(job.id);
        }
        Ok(())
    }

    async fn find_job(&self, id: JobId) -> Result<Option<DownloadJob>> {
        Ok(self.lock().jobs.get(&id).cloned())
    }

    async fn find_unfinished_jobs(&self) -> Result<Vec<DownloadJob>> {
        let state = self.lock();
        Ok(state
            .job_order
            .iter()
            .filter_map(|id| state.jobs.get(id))
            .filter(|j| matches!(j.status(), JobStatus::Pending | JobStatus::Running))
            .cloned()
            .collect())
    }

    async fn delete_job(&self, id: JobId) -> Result<bool> {
        let mut state = self.lock();
        state.job_order.retain(|j| *j != id);
        Ok(state.jobs.remove(&id).is_some())
    }

    async fn delete_task(&self, id: TaskId) -> Result<bool> {
        let mut state = self.lock();
        Ok(state
            .jobs
            .values_mut()
            .any(|job| job.remove_task(id).is_some()))
    }

    async fn find_job_id_for_task(&self, task_id: TaskId) -> Result<Option<JobId>> {
        let state = self.lock();
        Ok(state
            .jobs
            .values()
            .find(|job| job.task(task_id).is_some())
            .map(|job| job.id))
    }

    async fn list_jobs(&self) -> Result<Vec<JobSummary>> {
        let state = self.lock();
        Ok(state
            .job_order
            .iter()
            .rev()
            .filter_map(|id| state.jobs.get(id))
            .map(JobSummary::of)
            .collect())
    }

    async fn clean_tables(&self) -> Result<()> {
        let mut state = self.lock();
        state.jobs.clear();
        state.job_order.clear();
        state.channels.clear();
        state.seen.clear();
        Ok(())
    }

    async fn reset_sequence(&self) -> Result<()> {
        self.lock().next_channel_id = 0;
        Ok(())
    }
}

#[async_trait]
impl ChannelStore for MemoryStore {
    async fn add_channel(
        &self,
        channel_id: &str,
        title: Option<&str>,
        config_name: Option<&str>,
    ) -> Result<Channel> {
        let mut state = self.lock();
        if let Some(existing) = state
            .channels
            .values_mut()
            .find(|c| c.channel_id == channel_id)
        {
            if let Some(title) = title {
                existing.title = Some(title.to_string());
            }
            if let Some(config_name) = config_name {
                existing.config_name = Some(config_name.to_string());
            }
            return Ok(existing.clone());
        }
        state.next_channel_id += 1;
        let channel = Channel {
            id: state.next_channel_id,
            channel_id: channel_id.to_string(),
            title: title.map(str::to_string),
            config_name: config_name.map(str::to_string),
            added_at: unix_timestamp(),
        };
        state.channels.insert(channel.id, channel.clone());
        Ok(channel)
    }

    async fn remove_channel(&self, channel_id: &str) -> Result<bool> {
        let mut state = self.lock();
        let before = state.channels.len();
        state.channels.retain(|_, c| c.channel_id != channel_id);
        state.seen.retain(|(c, _)| c != channel_id);
        Ok(state.channels.len() != before)
    }

    async fn list_channels(&self) -> Result<Vec<Channel>> {
        Ok(self.lock().channels.values().cloned().collect())
    }

    async fn is_seen(&self, channel_id: &str, video_id: &str) -> Result<bool> {
        Ok(self
            .lock()
            .seen
            .contains(&(channel_id.to_string(), video_id.to_string())))
    }

    async fn mark_seen(&self, channel_id: &str, video_ids: &[String]) -> Result<()> {
        let mut state = self.lock();
        for video_id in video_ids {
            state.seen.insert((channel_id.to_string(), video_id.clone()));
        }
        Ok(())
    }
}
