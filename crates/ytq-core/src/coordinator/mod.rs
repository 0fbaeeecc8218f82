//! Job coordinator: owns jobs while they run, feeds their tasks to the worker
//! pool and folds task results back into job status.
//!
//! Each job sits behind its own async mutex. Every task mutation, the status
//! re-derivation and the store write for that job happen under that lock, so
//! concurrent worker callbacks for one job are serialized.

mod callback;
mod error;
mod events;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{broadcast, mpsc, watch, Mutex};

use crate::config::{DownloaderConfig, YtqConfig};
use crate::model::{DownloadJob, JobId, JobStatus, TaskId, TaskProgress, TaskSpec, TaskStatus};
use crate::pool::{TaskCallback, WorkItem, WorkerPool};
use crate::store::{JobStore, JobSummary};
use crate::url_model::resolve_video_id;

pub use error::{CoordinatorError, Reported};
pub use events::JobEvent;

const EVENT_CAPACITY: usize = 256;

/// A job plus the downloader config it was resolved with.
struct JobState {
    job: DownloadJob,
    config: Arc<DownloaderConfig>,
}

struct JobEntry {
    state: Mutex<JobState>,
    /// Latest snapshot, published on every status change.
    snapshot_tx: watch::Sender<DownloadJob>,
}

struct Inner {
    config: Arc<YtqConfig>,
    pool: Arc<WorkerPool>,
    store: Arc<dyn JobStore>,
    jobs: RwLock<HashMap<JobId, Arc<JobEntry>>>,
    task_owner: RwLock<HashMap<TaskId, JobId>>,
    progress_tx: Option<mpsc::Sender<TaskProgress>>,
    events: broadcast::Sender<JobEvent>,
}

/// Cheap to clone; all clones share the same jobs.
#[derive(Clone)]
pub struct JobCoordinator {
    inner: Arc<Inner>,
}

impl Inner {
    fn entry(&self, job_id: JobId) -> Option<Arc<JobEntry>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&job_id)
            .cloned()
    }

    /// Track a job in memory. If it is already tracked, the existing entry wins.
    fn register(&self, job: DownloadJob, config: Arc<DownloaderConfig>) -> Arc<JobEntry> {
        let job_id = job.id;
        let task_ids: Vec<TaskId> = job.tasks().iter().map(|t| t.id).collect();
        let (snapshot_tx, _) = watch::channel(job.clone());
        let entry = {
            let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(jobs.entry(job_id).or_insert_with(|| {
                Arc::new(JobEntry {
                    state: Mutex::new(JobState { job, config }),
                    snapshot_tx,
                })
            }))
        };
        let mut owners = self.task_owner.write().unwrap_or_else(PoisonError::into_inner);
        for task_id in task_ids {
            owners.insert(task_id, job_id);
        }
        entry
    }

    /// False once the job was removed, even if a caller still holds the entry.
    fn is_tracked(&self, job_id: JobId, entry: &JobEntry) -> bool {
        self.entry(job_id)
            .is_some_and(|current| std::ptr::eq(Arc::as_ptr(&current), entry))
    }

    fn forget(&self, job_id: JobId, task_ids: impl IntoIterator<Item = TaskId>) {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&job_id);
        let mut owners = self.task_owner.write().unwrap_or_else(PoisonError::into_inner);
        for task_id in task_ids {
            owners.remove(&task_id);
        }
    }

    fn owner_of(&self, task_id: TaskId) -> Option<JobId> {
        self.task_owner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&task_id)
            .copied()
    }

    fn emit(&self, event: JobEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    /// In-memory entry, or load the job from the store and track it.
    async fn entry_or_load(&self, job_id: JobId) -> Result<Arc<JobEntry>, CoordinatorError> {
        if let Some(entry) = self.entry(job_id) {
            return Ok(entry);
        }
        let job = self
            .store
            .find_job(job_id)
            .await
            .map_err(CoordinatorError::store)?
            .ok_or(CoordinatorError::JobNotFound(job_id))?;
        let config = Arc::new(self.config.downloader(&job.config_name)?.clone());
        Ok(self.register(job, config))
    }

    /// Called after any terminal task transition: re-derive status, stamp, persist,
    /// notify, and apply auto-removal. Store errors are logged, never returned.
    async fn settle(&self, entry: &JobEntry, state: &mut JobState) {
        let job_id = state.job.id;
        if !self.is_tracked(job_id, entry) {
            tracing::debug!(job_id = %job_id, "job removed, not persisting");
            return;
        }
        let changed = state.job.refresh_status();
        state.job.touch();
        let status = state.job.status();

        if changed {
            tracing::info!(job_id = %job_id, status = %status, "job status changed");
            entry.snapshot_tx.send_replace(state.job.clone());
            self.emit(JobEvent::JobStatusChanged { job_id, status });
        }

        if changed
            && status == JobStatus::Completed
            && state.config.remove_completed_job_automatically
        {
            match self.store.delete_job(job_id).await {
                Ok(_) => tracing::info!(job_id = %job_id, "completed job removed automatically"),
                Err(e) => tracing::warn!(job_id = %job_id, "auto-remove failed: {:#}", e),
            }
            self.forget(job_id, state.job.tasks().iter().map(|t| t.id));
            self.emit(JobEvent::JobRemoved { job_id });
            return;
        }

        if let Err(e) = self.store.save_job(&state.job).await {
            tracing::warn!(job_id = %job_id, "persist job failed: {:#}", e);
        }
    }
}

impl JobCoordinator {
    pub fn new(
        config: Arc<YtqConfig>,
        pool: Arc<WorkerPool>,
        store: Arc<dyn JobStore>,
        progress_tx: Option<mpsc::Sender<TaskProgress>>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                config,
                pool,
                store,
                jobs: RwLock::new(HashMap::new()),
                task_owner: RwLock::new(HashMap::new()),
                progress_tx,
                events,
            }),
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.inner.pool
    }

    /// Stream of task and job events. Slow receivers lag and lose the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.events.subscribe()
    }

    /// Submit every QUEUED task of a RUNNING job. Rejected tasks are failed on
    /// the spot; returns one warning per rejection.
    fn submit_queued(&self, state: &mut JobState) -> Vec<String> {
        let mut warnings = Vec::new();
        let callback: Arc<dyn TaskCallback> = self.inner.clone();
        for task_id in state.job.queued_task_ids() {
            let Some(task) = state.job.task(task_id) else {
                continue;
            };
            let spec = TaskSpec {
                job_id: state.job.id,
                task_id,
                video_id: task.video_id.clone(),
            };
            let item = WorkItem {
                spec,
                config: Arc::clone(&state.config),
                callback: Arc::clone(&callback),
                progress: self.inner.progress_tx.clone(),
            };
            if let Err(e) = self.inner.pool.submit(item) {
                tracing::warn!(job_id = %state.job.id, task_id = %task_id, "submit rejected: {}", e);
                let video_id = task.video_id.clone();
                state.job.fail_task(task_id, &e.to_string());
                warnings.push(format!("task for video {video_id} not started: {e}"));
            }
        }
        warnings
    }

    /// Create a job for `urls` using the named downloader configuration.
    ///
    /// Unresolvable and duplicate URLs are skipped with a warning. Starts the job
    /// right away when the configuration asks for it.
    pub async fn create_job(
        &self,
        config_name: &str,
        urls: &[String],
    ) -> Result<Reported<DownloadJob>, CoordinatorError> {
        let config = Arc::new(self.inner.config.downloader(config_name)?.clone());

        let mut warnings = Vec::new();
        let mut seen = HashSet::new();
        let mut video_ids = Vec::new();
        for url in urls {
            match resolve_video_id(url) {
                Ok(id) if seen.insert(id.clone()) => video_ids.push(id),
                Ok(id) => warnings.push(format!("duplicate video {id} skipped")),
                Err(e) => warnings.push(format!("skipped `{url}`: {e}")),
            }
        }
        if video_ids.is_empty() {
            return Err(CoordinatorError::NoVideos);
        }

        let job = DownloadJob::new(config_name, video_ids);
        let job_id = job.id;
        self.inner
            .store
            .save_job(&job)
            .await
            .map_err(CoordinatorError::store)?;
        tracing::info!(job_id = %job_id, config = config_name, tasks = job.tasks().len(), "job created");

        let auto_start = config.start_download_automatically;
        let snapshot = job.clone();
        self.inner.register(job, config);

        if auto_start {
            let started = self.start_job(job_id).await?;
            warnings.extend(started.warnings);
            return Ok(Reported::with_warnings(started.value, warnings));
        }
        Ok(Reported::with_warnings(snapshot, warnings))
    }

    /// PENDING → RUNNING and submit every queued task.
    pub async fn start_job(&self, job_id: JobId) -> Result<Reported<DownloadJob>, CoordinatorError> {
        let entry = self.inner.entry_or_load(job_id).await?;
        let mut state = entry.state.lock().await;

        if state.job.tasks().is_empty() {
            return Err(CoordinatorError::InvalidState {
                job_id,
                status: state.job.status(),
                action: "start an empty",
            });
        }
        let mut next = state.job.clone();
        next.start().map_err(|e| CoordinatorError::InvalidState {
            job_id,
            status: e.from,
            action: "start",
        })?;
        next.touch();
        self.inner
            .store
            .save_job(&next)
            .await
            .map_err(CoordinatorError::store)?;
        state.job = next;
        entry.snapshot_tx.send_replace(state.job.clone());
        self.inner.emit(JobEvent::JobStatusChanged {
            job_id,
            status: JobStatus::Running,
        });
        tracing::info!(job_id = %job_id, "job started");

        let warnings = self.submit_queued(&mut state);
        if !warnings.is_empty() {
            self.inner.settle(&entry, &mut state).await;
        }
        Ok(Reported::with_warnings(state.job.clone(), warnings))
    }

    /// Snapshot of a job: in memory first, then the store.
    pub async fn get_job(&self, job_id: JobId) -> Result<Reported<DownloadJob>, CoordinatorError> {
        if let Some(entry) = self.inner.entry(job_id) {
            let state = entry.state.lock().await;
            return Ok(Reported::new(state.job.clone()));
        }
        self.inner
            .store
            .find_job(job_id)
            .await
            .map_err(CoordinatorError::store)?
            .map(Reported::new)
            .ok_or(CoordinatorError::JobNotFound(job_id))
    }

    /// Remove one task from its job and from the store.
    ///
    /// A running download is not interrupted; its result is discarded when it arrives.
    pub async fn delete_task(&self, task_id: TaskId) -> Result<Reported<DownloadJob>, CoordinatorError> {
        let job_id = match self.inner.owner_of(task_id) {
            Some(job_id) => job_id,
            None => self
                .inner
                .store
                .find_job_id_for_task(task_id)
                .await
                .map_err(CoordinatorError::store)?
                .ok_or(CoordinatorError::TaskNotFound(task_id))?,
        };
        let entry = self.inner.entry_or_load(job_id).await?;
        let mut state = entry.state.lock().await;

        let task = state
            .job
            .remove_task(task_id)
            .ok_or(CoordinatorError::TaskNotFound(task_id))?;
        self.inner
            .task_owner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&task_id);

        let mut warnings = Vec::new();
        if task.status == TaskStatus::Running {
            warnings.push(format!(
                "task for video {} was running; the download continues but its result will be discarded",
                task.video_id
            ));
        }
        self.inner
            .store
            .delete_task(task_id)
            .await
            .map_err(CoordinatorError::store)?;
        tracing::info!(job_id = %job_id, task_id = %task_id, "task deleted");

        if state.job.status() == JobStatus::Running {
            self.inner.settle(&entry, &mut state).await;
        } else {
            state.job.touch();
            self.inner
                .store
                .save_job(&state.job)
                .await
                .map_err(CoordinatorError::store)?;
        }
        Ok(Reported::with_warnings(state.job.clone(), warnings))
    }

    /// Fail every still-queued task. Running downloads finish normally.
    pub async fn cancel_job(&self, job_id: JobId) -> Result<Reported<DownloadJob>, CoordinatorError> {
        let entry = self.inner.entry_or_load(job_id).await?;
        let mut state = entry.state.lock().await;
        let status = state.job.status();
        if status.is_terminal() {
            return Err(CoordinatorError::InvalidState {
                job_id,
                status,
                action: "cancel",
            });
        }
        if status == JobStatus::Pending {
            // Cancelling a job that never started ends it as FAILED.
            let _ = state.job.start();
            entry.snapshot_tx.send_replace(state.job.clone());
        }

        let mut cancelled = 0usize;
        for task_id in state.job.queued_task_ids() {
            if state.job.fail_task(task_id, "cancelled") {
                cancelled += 1;
            }
        }
        let still_running = state
            .job
            .tasks()
            .iter()
            .filter(|t| t.status == TaskStatus::Running)
            .count();
        tracing::info!(job_id = %job_id, cancelled, still_running, "job cancelled");

        let mut warnings = Vec::new();
        if still_running > 0 {
            warnings.push(format!(
                "{still_running} running download(s) will finish normally"
            ));
        }
        self.inner.settle(&entry, &mut state).await;
        Ok(Reported::with_warnings(state.job.clone(), warnings))
    }

    /// Delete a job and its tasks. Running downloads are detached.
    pub async fn remove_job(&self, job_id: JobId) -> Result<Reported<()>, CoordinatorError> {
        let mut warnings = Vec::new();
        let entry = self
            .inner
            .jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&job_id);
        let in_memory = entry.is_some();
        // Held until the store delete is done so no callback writes the job back.
        let mut held = None;
        if let Some(entry) = &entry {
            let state = entry.state.lock().await;
            let running = state
                .job
                .tasks()
                .iter()
                .filter(|t| t.status == TaskStatus::Running)
                .count();
            if running > 0 {
                warnings.push(format!(
                    "{running} running download(s) detached; their results will be discarded"
                ));
            }
            self.inner
                .forget(job_id, state.job.tasks().iter().map(|t| t.id));
            held = Some(state);
        }

        let in_store = self
            .inner
            .store
            .delete_job(job_id)
            .await
            .map_err(CoordinatorError::store)?;
        drop(held);
        if !in_memory && !in_store {
            return Err(CoordinatorError::JobNotFound(job_id));
        }
        tracing::info!(job_id = %job_id, "job removed");
        self.inner.emit(JobEvent::JobRemoved { job_id });
        Ok(Reported::with_warnings((), warnings))
    }

    /// New job with the same configuration for every failed video of a finished job.
    pub async fn retry_failed(&self, job_id: JobId) -> Result<Reported<DownloadJob>, CoordinatorError> {
        let job = self.get_job(job_id).await?.value;
        let status = job.status();
        if !matches!(status, JobStatus::Failed | JobStatus::PartiallyCompleted) {
            return Err(CoordinatorError::InvalidState {
                job_id,
                status,
                action: "retry",
            });
        }
        let failed = job.failed_video_ids();
        if failed.is_empty() {
            return Err(CoordinatorError::NothingToRetry(job_id));
        }
        tracing::info!(job_id = %job_id, videos = failed.len(), "retrying failed videos in a new job");
        self.create_job(&job.config_name, &failed).await
    }

    /// Reload unfinished jobs after a restart.
    ///
    /// Tasks left RUNNING by a previous process are failed as interrupted;
    /// RUNNING jobs get their queued tasks resubmitted; PENDING jobs are tracked as-is.
    pub async fn recover_jobs(&self) -> Result<Reported<usize>, CoordinatorError> {
        let jobs = self
            .inner
            .store
            .find_unfinished_jobs()
            .await
            .map_err(CoordinatorError::store)?;

        let mut warnings = Vec::new();
        let mut recovered = 0usize;
        for mut job in jobs {
            if self.inner.entry(job.id).is_some() {
                continue;
            }
            let job_id = job.id;
            let interrupted: Vec<TaskId> = job
                .tasks()
                .iter()
                .filter(|t| t.status == TaskStatus::Running)
                .map(|t| t.id)
                .collect();
            for task_id in &interrupted {
                job.fail_task(*task_id, "interrupted: the process stopped while the task was running");
            }

            let config = match self.inner.config.downloader(&job.config_name) {
                Ok(cfg) => Arc::new(cfg.clone()),
                Err(e) => {
                    for task_id in job.queued_task_ids() {
                        job.fail_task(task_id, &e.to_string());
                    }
                    if job.status() == JobStatus::Pending {
                        let _ = job.start();
                    }
                    warnings.push(format!("job {job_id}: {e}"));
                    Arc::new(DownloaderConfig::default())
                }
            };

            let entry = self.inner.register(job, config);
            let mut state = entry.state.lock().await;
            if state.job.status() == JobStatus::Running {
                warnings.extend(self.submit_queued(&mut state));
                self.inner.settle(&entry, &mut state).await;
            } else if !interrupted.is_empty() {
                state.job.touch();
                if let Err(e) = self.inner.store.save_job(&state.job).await {
                    tracing::warn!(job_id = %job_id, "persist recovered job failed: {:#}", e);
                }
            }
            tracing::info!(job_id = %job_id, status = %state.job.status(), interrupted = interrupted.len(), "job recovered");
            recovered += 1;
        }
        Ok(Reported::with_warnings(recovered, warnings))
    }

    /// Summaries of every stored job, newest first.
    pub async fn list_jobs(&self) -> Result<Reported<Vec<JobSummary>>, CoordinatorError> {
        self.inner
            .store
            .list_jobs()
            .await
            .map(Reported::new)
            .map_err(CoordinatorError::store)
    }

    /// Resolves with the job's terminal status.
    pub async fn wait_for_job(&self, job_id: JobId) -> Result<JobStatus, CoordinatorError> {
        self.wait_for_outcome(job_id).await.map(|job| job.status())
    }

    /// Resolves with the job as it was when it reached a terminal status. Still
    /// works when the job is removed automatically right after completing.
    pub async fn wait_for_outcome(&self, job_id: JobId) -> Result<DownloadJob, CoordinatorError> {
        let entry = match self.inner.entry(job_id) {
            Some(entry) => entry,
            None => {
                let job = self.get_job(job_id).await?.value;
                if job.status().is_terminal() {
                    return Ok(job);
                }
                self.inner.entry_or_load(job_id).await?
            }
        };
        let mut rx = entry.snapshot_tx.subscribe();
        drop(entry);
        let job = rx
            .wait_for(|job| job.status().is_terminal())
            .await
            .map(|job| job.clone())
            .map_err(|_| CoordinatorError::JobNotFound(job_id))?;
        Ok(job)
    }

    /// Shut the worker pool down. See `WorkerPool::shutdown`.
    pub async fn shutdown(&self, drain: bool) {
        self.inner.pool.shutdown(drain).await;
    }
}
