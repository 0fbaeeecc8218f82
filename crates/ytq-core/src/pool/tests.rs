//! Worker pool tests with in-process executors.

use super::*;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;
use uuid::Uuid;

/// Sleeps, tracks concurrency, and panics for video ids starting with "panic".
#[derive(Default)]
struct SlowExecutor {
    delay_ms: u64,
    running: AtomicUsize,
    max_seen: AtomicUsize,
}

#[async_trait]
impl TaskExecutor for SlowExecutor {
    async fn execute(
        &self,
        task: &TaskSpec,
        _config: &DownloaderConfig,
        _progress: Option<&mpsc::Sender<TaskProgress>>,
    ) -> DownloadResult {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        if task.video_id.starts_with("panic") {
            panic!("executor blew up");
        }
        DownloadResult::succeeded(&task.video_id, PathBuf::from("/dev/null"), 0)
    }
}

#[derive(Default)]
struct Recorder {
    started: Mutex<Vec<String>>,
    completed: Mutex<Vec<DownloadResult>>,
    cancelled: Mutex<Vec<String>>,
    skip: Option<String>,
}

#[async_trait]
impl TaskCallback for Recorder {
    async fn on_start(&self, task: &TaskSpec) -> bool {
        if self.skip.as_deref() == Some(task.video_id.as_str()) {
            return false;
        }
        self.started.lock().unwrap().push(task.video_id.clone());
        true
    }

    async fn on_complete(&self, _task: &TaskSpec, result: DownloadResult) {
        self.completed.lock().unwrap().push(result);
    }

    async fn on_cancelled(&self, task: &TaskSpec) {
        self.cancelled.lock().unwrap().push(task.video_id.clone());
    }
}

fn item(video_id: &str, callback: &Arc<Recorder>) -> WorkItem {
    WorkItem {
        spec: TaskSpec {
            job_id: Uuid::nil(),
            task_id: Uuid::new_v4(),
            video_id: video_id.to_string(),
        },
        config: Arc::new(DownloaderConfig::default()),
        callback: Arc::clone(callback) as Arc<dyn TaskCallback>,
        progress: None,
    }
}

fn executor(delay_ms: u64) -> Arc<SlowExecutor> {
    Arc::new(SlowExecutor {
        delay_ms,
        ..Default::default()
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn never_exceeds_pool_size() {
    let exec = executor(30);
    let pool = WorkerPool::new(3, None, exec.clone());
    let rec = Arc::new(Recorder::default());
    for i in 0..10 {
        pool.submit(item(&format!("video{i}"), &rec)).unwrap();
    }
    pool.shutdown(true).await;

    assert_eq!(rec.completed.lock().unwrap().len(), 10);
    assert_eq!(exec.max_seen.load(Ordering::SeqCst), 3);
    assert_eq!(pool.peak_in_flight(), 3);
    assert_eq!(pool.in_flight(), 0);
    assert_eq!(pool.queued(), 0);
}

#[tokio::test]
async fn single_worker_runs_fifo() {
    let pool = WorkerPool::new(1, None, executor(1));
    let rec = Arc::new(Recorder::default());
    for id in ["a", "b", "c", "d"] {
        pool.submit(item(id, &rec)).unwrap();
    }
    pool.shutdown(true).await;
    assert_eq!(*rec.started.lock().unwrap(), vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn panic_becomes_failed_result_and_worker_survives() {
    let pool = WorkerPool::new(1, None, executor(1));
    let rec = Arc::new(Recorder::default());
    pool.submit(item("panic-1", &rec)).unwrap();
    pool.submit(item("fine", &rec)).unwrap();
    pool.shutdown(true).await;

    let completed = rec.completed.lock().unwrap();
    assert_eq!(completed.len(), 2);
    let failed = completed.iter().find(|r| r.video_id == "panic-1").unwrap();
    assert!(failed.error_message().unwrap().contains("panicked"));
    assert!(completed.iter().any(|r| r.video_id == "fine" && r.success()));
}

#[tokio::test]
async fn on_start_false_skips_execution() {
    let pool = WorkerPool::new(2, None, executor(1));
    let rec = Arc::new(Recorder {
        skip: Some("skipme".to_string()),
        ..Default::default()
    });
    pool.submit(item("skipme", &rec)).unwrap();
    pool.submit(item("runme", &rec)).unwrap();
    pool.shutdown(true).await;
    let completed = rec.completed.lock().unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].video_id, "runme");
}

#[tokio::test]
async fn shutdown_without_drain_cancels_queued() {
    let pool = WorkerPool::new(1, None, executor(100));
    let rec = Arc::new(Recorder::default());
    pool.submit(item("first", &rec)).unwrap();
    // Let the worker pick up the first task.
    tokio::time::sleep(Duration::from_millis(30)).await;
    for id in ["q1", "q2", "q3"] {
        pool.submit(item(id, &rec)).unwrap();
    }
    pool.shutdown(false).await;

    let completed = rec.completed.lock().unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].video_id, "first");
    assert_eq!(*rec.cancelled.lock().unwrap(), vec!["q1", "q2", "q3"]);
}

#[tokio::test]
async fn submit_after_shutdown_is_rejected() {
    let pool = WorkerPool::new(2, None, executor(1));
    pool.shutdown(true).await;
    let rec = Arc::new(Recorder::default());
    assert_eq!(
        pool.submit(item("late", &rec)).unwrap_err(),
        PoolError::ShuttingDown
    );
}

#[tokio::test]
async fn bounded_queue_rejects_overflow() {
    let pool = WorkerPool::new(1, Some(2), executor(100));
    let rec = Arc::new(Recorder::default());
    pool.submit(item("running", &rec)).unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    pool.submit(item("w1", &rec)).unwrap();
    pool.submit(item("w2", &rec)).unwrap();
    assert_eq!(pool.queued(), 2);
    assert_eq!(
        pool.submit(item("w3", &rec)).unwrap_err(),
        PoolError::QueueFull { capacity: 2 }
    );
    pool.shutdown(true).await;
    assert_eq!(rec.completed.lock().unwrap().len(), 3);
}
