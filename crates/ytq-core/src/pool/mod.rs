//! Fixed-size worker pool over a FIFO queue.
//!
//! `size` worker tasks share one queue receiver. Each execution runs in its own
//! spawned task so a panicking executor yields a failed result instead of
//! killing the worker.

mod callback;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::DownloaderConfig;
use crate::executor::TaskExecutor;
use crate::model::{DownloadResult, TaskProgress, TaskSpec};

pub use callback::TaskCallback;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("worker pool is shutting down")]
    ShuttingDown,
    #[error("worker pool queue is full ({capacity} waiting tasks)")]
    QueueFull { capacity: usize },
}

/// One unit of work: the task, the config it runs with, and who to tell.
pub struct WorkItem {
    pub spec: TaskSpec,
    pub config: Arc<DownloaderConfig>,
    pub callback: Arc<dyn TaskCallback>,
    pub progress: Option<mpsc::Sender<TaskProgress>>,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

pub struct WorkerPool {
    size: usize,
    capacity: Option<usize>,
    sender: Mutex<Option<mpsc::UnboundedSender<WorkItem>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
    cancel_queued: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Spawns `size` workers (at least one). Must be called inside a Tokio runtime.
    pub fn new(size: usize, capacity: Option<usize>, executor: Arc<dyn TaskExecutor>) -> Self {
        let size = size.max(1);
        let (tx, rx) = mpsc::unbounded_channel::<WorkItem>();
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let counters = Arc::new(Counters::default());
        let cancel_queued = Arc::new(AtomicBool::new(false));

        let workers = (0..size)
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    Arc::clone(&rx),
                    Arc::clone(&executor),
                    Arc::clone(&counters),
                    Arc::clone(&cancel_queued),
                ))
            })
            .collect();

        tracing::debug!(size, ?capacity, "worker pool started");
        Self {
            size,
            capacity,
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            counters,
            cancel_queued,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Tasks waiting for a worker.
    pub fn queued(&self) -> usize {
        self.counters.queued.load(Ordering::Relaxed)
    }

    /// Tasks currently executing.
    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::Relaxed)
    }

    /// Highest `in_flight` value observed since the pool started.
    pub fn peak_in_flight(&self) -> usize {
        self.counters.peak_in_flight.load(Ordering::Relaxed)
    }

    /// Reserve a queue slot, honoring `capacity`.
    fn reserve_slot(&self) -> Result<(), PoolError> {
        let Some(capacity) = self.capacity else {
            self.counters.queued.fetch_add(1, Ordering::AcqRel);
            return Ok(());
        };
        let mut current = self.counters.queued.load(Ordering::Relaxed);
        loop {
            if current >= capacity {
                return Err(PoolError::QueueFull { capacity });
            }
            match self.counters.queued.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    /// Queue a task. Runs in FIFO order once a worker is free.
    pub fn submit(&self, item: WorkItem) -> Result<(), PoolError> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = guard.as_ref() else {
            return Err(PoolError::ShuttingDown);
        };
        self.reserve_slot()?;
        if tx.send(item).is_err() {
            self.counters.queued.fetch_sub(1, Ordering::AcqRel);
            return Err(PoolError::ShuttingDown);
        }
        Ok(())
    }

    /// Stop accepting work and wait for the workers to exit.
    ///
    /// With `drain`, every queued task still runs. Without it, queued tasks get
    /// `on_cancelled` and only in-flight executions are awaited.
    pub async fn shutdown(&self, drain: bool) {
        if !drain {
            self.cancel_queued.store(true, Ordering::Release);
        }
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let workers =
            std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in workers {
            if let Err(e) = handle.await {
                tracing::warn!("worker exited abnormally: {}", e);
            }
        }
        tracing::debug!(drain, "worker pool stopped");
    }
}

async fn worker_loop(
    worker: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<WorkItem>>>,
    executor: Arc<dyn TaskExecutor>,
    counters: Arc<Counters>,
    cancel_queued: Arc<AtomicBool>,
) {
    loop {
        let next = rx.lock().await.recv().await;
        let Some(item) = next else {
            break;
        };
        counters.queued.fetch_sub(1, Ordering::AcqRel);
        let WorkItem {
            spec,
            config,
            callback,
            progress,
        } = item;

        if cancel_queued.load(Ordering::Acquire) {
            callback.on_cancelled(&spec).await;
            continue;
        }
        if !callback.on_start(&spec).await {
            tracing::debug!(worker, task_id = %spec.task_id, "task skipped before start");
            continue;
        }

        let now = counters.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        counters.peak_in_flight.fetch_max(now, Ordering::AcqRel);

        let exec = Arc::clone(&executor);
        let run_spec = spec.clone();
        let result = tokio::spawn(async move {
            exec.execute(&run_spec, &config, progress.as_ref()).await
        })
        .await
        .unwrap_or_else(|e| {
            tracing::error!(worker, task_id = %spec.task_id, "executor panicked: {}", e);
            DownloadResult::failed(&spec.video_id, format!("executor panicked: {e}"))
        });

        counters.in_flight.fetch_sub(1, Ordering::AcqRel);
        callback.on_complete(&spec, result).await;
    }
}

#[cfg(test)]
mod tests;
