//! Fetch scheduler: periodically discovers new uploads of tracked channels and
//! turns them into download jobs, within the daily API quota.
//!
//! Cycles are single-flight. A fire that arrives while a cycle is still running
//! is skipped, never queued.

mod trigger;

use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::FetchSchedulerConfig;
use crate::coordinator::JobCoordinator;
use crate::discovery::Discovery;
use crate::quota::QuotaTracker;
use crate::store::{Channel, ChannelStore};

pub use trigger::{parse_time_zone, Trigger};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid cron expression `{expr}`: {reason}")]
    InvalidCron { expr: String, reason: String },
    #[error("invalid time zone `{0}`")]
    InvalidTimeZone(String),
    #[error("no trigger configured: set `cron` or a non-zero `fixed_rate_secs`")]
    NoTrigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    Disabled,
    AlreadyRunning,
    QuotaExhausted,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SkipReason::Disabled => "scheduler disabled",
            SkipReason::AlreadyRunning => "previous cycle still running",
            SkipReason::QuotaExhausted => "daily quota exhausted",
        })
    }
}

/// What one fire of the scheduler did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleOutcome {
    Completed {
        channels: usize,
        discovered: usize,
        jobs_created: usize,
        units_used: u64,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        message: String,
    },
}

/// Clears the in-flight flag when the cycle ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Inner {
    name: String,
    config: FetchSchedulerConfig,
    trigger: Trigger,
    quota: Arc<QuotaTracker>,
    quota_path: Option<PathBuf>,
    coordinator: JobCoordinator,
    channels: Arc<dyn ChannelStore>,
    discovery: Arc<dyn Discovery>,
    running: AtomicBool,
}

#[derive(Clone)]
pub struct FetchScheduler {
    inner: Arc<Inner>,
}

impl FetchScheduler {
    /// Fails on a malformed cron expression or time zone, or when no trigger is set.
    pub fn new(
        name: impl Into<String>,
        config: FetchSchedulerConfig,
        quota: Arc<QuotaTracker>,
        coordinator: JobCoordinator,
        channels: Arc<dyn ChannelStore>,
        discovery: Arc<dyn Discovery>,
    ) -> Result<Self, SchedulerError> {
        let trigger = Trigger::from_config(&config)?;
        Ok(Self {
            inner: Arc::new(Inner {
                name: name.into(),
                config,
                trigger,
                quota,
                quota_path: None,
                coordinator,
                channels,
                discovery,
                running: AtomicBool::new(false),
            }),
        })
    }

    /// Persist quota usage to `path` after every cycle that spent units.
    pub fn with_quota_path(mut self, path: PathBuf) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.quota_path = Some(path),
            None => tracing::warn!("scheduler already shared; quota path not set"),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn trigger(&self) -> &Trigger {
        &self.inner.trigger
    }

    pub fn quota(&self) -> &QuotaTracker {
        &self.inner.quota
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Timer entry point: skipped unless `auto_start` is set.
    pub async fn run_cycle(&self) -> CycleOutcome {
        if !self.inner.config.auto_start {
            tracing::debug!(scheduler = %self.inner.name, "fetch skipped: scheduler disabled");
            return CycleOutcome::Skipped {
                reason: SkipReason::Disabled,
            };
        }
        self.cycle().await
    }

    /// Manual fetch: ignores `auto_start`, still single-flight and quota-gated.
    pub async fn trigger_now(&self) -> CycleOutcome {
        self.cycle().await
    }

    async fn cycle(&self) -> CycleOutcome {
        let inner = &self.inner;
        let Some(_flight) = InFlight::acquire(&inner.running) else {
            tracing::info!(scheduler = %inner.name, "fetch skipped: previous cycle still running");
            return CycleOutcome::Skipped {
                reason: SkipReason::AlreadyRunning,
            };
        };

        let cost = inner.config.estimated_discovery_cost;
        let Some(reservation) = inner.quota.try_reserve(cost) else {
            let window = inner.quota.current_window();
            tracing::info!(
                scheduler = %inner.name,
                cost,
                used = window.used_units,
                limit = window.daily_limit,
                threshold = window.safety_threshold,
                "fetch skipped: quota exhausted"
            );
            return CycleOutcome::Skipped {
                reason: SkipReason::QuotaExhausted,
            };
        };

        let channels = match inner.channels.list_channels().await {
            Ok(c) => c,
            Err(e) => {
                drop(reservation);
                return self.failed(format!("list channels: {e:#}"));
            }
        };

        let mut units = 0u64;
        let mut batches: Vec<(Channel, Vec<String>)> = Vec::new();
        let mut failure = None;
        for channel in channels.iter() {
            match inner.discovery.list_new_videos(&channel.channel_id).await {
                Ok(batch) => {
                    units += batch.units_used;
                    if !batch.video_ids.is_empty() {
                        batches.push((channel.clone(), batch.video_ids));
                    }
                }
                Err(e) => {
                    units += e.units_used;
                    failure = Some(format!("discovery for channel {}: {}", channel.channel_id, e));
                    break;
                }
            }
        }
        reservation.commit(units);
        self.persist_quota();
        if let Some(message) = failure {
            return self.failed(message);
        }

        let discovered = batches.iter().map(|(_, ids)| ids.len()).sum();
        let mut jobs_created = 0;
        for (channel, video_ids) in batches {
            let config_name = channel
                .config_name
                .as_deref()
                .unwrap_or(&inner.config.config_name);
            let created = match inner.coordinator.create_job(config_name, &video_ids).await {
                Ok(r) => r,
                Err(e) => {
                    return self.failed(format!("create job for channel {}: {}", channel.channel_id, e))
                }
            };
            for warning in &created.warnings {
                tracing::warn!(channel_id = %channel.channel_id, "{}", warning);
            }
            if let Err(e) = inner.channels.mark_seen(&channel.channel_id, &video_ids).await {
                // Unseen videos come back on the next fire; the job must not exist twice.
                if let Err(rm) = inner.coordinator.remove_job(created.value.id).await {
                    tracing::warn!(job_id = %created.value.id, "remove unrecorded job failed: {}", rm);
                }
                return self.failed(format!("mark seen for channel {}: {e:#}", channel.channel_id));
            }
            tracing::info!(
                channel_id = %channel.channel_id,
                job_id = %created.value.id,
                videos = video_ids.len(),
                "job created from discovery"
            );
            jobs_created += 1;
        }

        tracing::info!(
            scheduler = %inner.name,
            channels = channels.len(),
            discovered,
            jobs_created,
            units,
            "fetch cycle done"
        );
        CycleOutcome::Completed {
            channels: channels.len(),
            discovered,
            jobs_created,
            units_used: units,
        }
    }

    fn failed(&self, message: String) -> CycleOutcome {
        tracing::warn!(scheduler = %self.inner.name, "fetch cycle failed: {}", message);
        CycleOutcome::Failed { message }
    }

    fn persist_quota(&self) {
        if let Some(path) = &self.inner.quota_path {
            if let Err(e) = self.inner.quota.save_to_path(path) {
                tracing::warn!("save quota state failed: {:#}", e);
            }
        }
    }

    /// Fire on the trigger until `shutdown` turns true (or its sender is dropped).
    /// Each fire runs on its own task so a slow cycle makes later fires skip.
    pub fn spawn(&self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut next = this.inner.trigger.first_fire(Utc::now());
            loop {
                let Some(at) = next else {
                    tracing::warn!(scheduler = %this.inner.name, "trigger has no further fire times");
                    break;
                };
                let wait = (at - Utc::now()).to_std().unwrap_or_default();
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }
                let fire = this.clone();
                tokio::spawn(async move {
                    let outcome = fire.run_cycle().await;
                    tracing::debug!(scheduler = %fire.inner.name, ?outcome, "fire finished");
                });
                next = this.inner.trigger.next_fire_after(at.max(Utc::now()));
            }
            tracing::info!(scheduler = %this.inner.name, "fetch scheduler stopped");
        })
    }
}
