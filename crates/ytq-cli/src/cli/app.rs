//! Wires the engine together for one CLI invocation.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use ytq_core::config::YtqConfig;
use ytq_core::coordinator::JobCoordinator;
use ytq_core::discovery::{Discovery, YouTubeApiDiscovery};
use ytq_core::executor::{TaskExecutor, YtDlpExecutor};
use ytq_core::model::TaskProgress;
use ytq_core::pool::WorkerPool;
use ytq_core::quota::QuotaTracker;
use ytq_core::scheduler::{parse_time_zone, FetchScheduler};
use ytq_core::store::{ChannelStore, JobStore, SqliteStore};

use super::output::Output;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

pub struct App {
    pub config: Arc<YtqConfig>,
    pub store: Arc<SqliteStore>,
    pub coordinator: JobCoordinator,
}

impl App {
    pub async fn open(config: YtqConfig, out: &Output) -> Result<Self> {
        let config = Arc::new(config);
        let store = Arc::new(SqliteStore::open_default().await?);

        let cwd = std::env::current_dir().context("current directory")?;
        let download_folder = config.download_folder_or(&cwd);
        let executor: Arc<dyn TaskExecutor> = Arc::new(YtDlpExecutor::new(
            config.downloader_path.clone(),
            download_folder,
        ));
        let pool = Arc::new(WorkerPool::new(
            config.thread_pool_size,
            config.queue_capacity,
            executor,
        ));

        let progress_tx = if out.is_json() {
            None
        } else {
            let (tx, rx) = tokio::sync::mpsc::channel::<TaskProgress>(64);
            tokio::spawn(print_progress(rx));
            Some(tx)
        };

        let coordinator = JobCoordinator::new(
            Arc::clone(&config),
            pool,
            Arc::clone(&store) as Arc<dyn JobStore>,
            progress_tx,
        );
        Ok(Self {
            config,
            store,
            coordinator,
        })
    }

    /// Build the named fetch scheduler (or `active_scheduler`). Needs an API key.
    pub fn scheduler(&self, name: Option<&str>) -> Result<FetchScheduler> {
        let name = name.unwrap_or(&self.config.active_scheduler);
        let sched = self.config.scheduler(name)?.clone();
        let api_key = self
            .config
            .api_key()
            .map(str::to_string)
            .context("youtube_api_key is not set (config file or YTQ_YOUTUBE_API_KEY)")?;

        let tz = parse_time_zone(&sched.time_zone)?;
        let quota = Arc::new(QuotaTracker::new(sched.daily_limit, sched.safety_threshold, tz));
        let quota_path = QuotaTracker::default_path()?;
        match quota.load_from_path(&quota_path) {
            Ok(true) => tracing::debug!("restored today's quota usage"),
            Ok(false) => {}
            Err(e) => tracing::warn!("ignoring quota state: {:#}", e),
        }

        let channels = Arc::clone(&self.store) as Arc<dyn ChannelStore>;
        let discovery: Arc<dyn Discovery> = Arc::new(YouTubeApiDiscovery::new(
            api_key,
            self.config.youtube_api_base_url.clone(),
            Arc::clone(&channels),
            sched.max_pages_per_channel,
        ));
        let scheduler = FetchScheduler::new(
            name,
            sched,
            quota,
            self.coordinator.clone(),
            channels,
            discovery,
        )?
        .with_quota_path(quota_path);
        Ok(scheduler)
    }
}

/// Throttled per-video progress lines on stderr.
async fn print_progress(mut rx: tokio::sync::mpsc::Receiver<TaskProgress>) {
    let mut last_print: HashMap<String, Instant> = HashMap::new();
    while let Some(p) = rx.recv().await {
        let now = Instant::now();
        let done = p.fraction().is_some_and(|f| f >= 1.0);
        let due = last_print
            .get(&p.video_id)
            .map_or(true, |t| now.duration_since(*t) >= PROGRESS_INTERVAL);
        if !due && !done {
            continue;
        }
        let done_mib = p.bytes_done as f64 / 1_048_576.0;
        match p.fraction() {
            Some(f) => eprintln!("  {}  {:.1} MiB ({:.1}%)", p.video_id, done_mib, f * 100.0),
            None => eprintln!("  {}  {:.1} MiB", p.video_id, done_mib),
        }
        last_print.insert(p.video_id, now);
    }
}
