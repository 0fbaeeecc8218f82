//! Integration test: coordinator + worker pool + real subprocess executor + SQLite store.
//!
//! A shell script stands in for yt-dlp, so downloads are real processes writing
//! real files into a temp download folder.

#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use tokio::sync::mpsc;
use ytq_core::config::{DownloaderConfig, YtqConfig};
use ytq_core::coordinator::{JobCoordinator, JobEvent};
use ytq_core::executor::{TaskExecutor, YtDlpExecutor};
use ytq_core::model::{JobStatus, TaskStatus};
use ytq_core::pool::WorkerPool;
use ytq_core::store::{JobStore, SqliteStore};

struct Engine {
    coordinator: JobCoordinator,
    store: Arc<SqliteStore>,
    _dirs: (tempfile::TempDir, tempfile::TempDir),
    download_dir: std::path::PathBuf,
}

async fn engine(progress: Option<mpsc::Sender<ytq_core::model::TaskProgress>>) -> Engine {
    let bin_dir = tempdir().unwrap();
    let state_dir = tempdir().unwrap();
    let download_dir = state_dir.path().join("downloads");
    let bin = common::fake_yt_dlp(bin_dir.path());

    let mut cfg = YtqConfig::default();
    cfg.downloaders.insert(
        "cleanup".into(),
        DownloaderConfig {
            remove_completed_job_automatically: true,
            ..Default::default()
        },
    );

    let store = Arc::new(SqliteStore::open_at(state_dir.path().join("ytq.db")).await.unwrap());
    let executor: Arc<dyn TaskExecutor> = Arc::new(YtDlpExecutor::new(bin, &download_dir));
    let pool = Arc::new(WorkerPool::new(3, None, executor));
    let coordinator = JobCoordinator::new(
        Arc::new(cfg),
        pool,
        Arc::clone(&store) as Arc<dyn JobStore>,
        progress,
    );
    Engine {
        coordinator,
        store,
        _dirs: (bin_dir, state_dir),
        download_dir,
    }
}

async fn finished(coordinator: &JobCoordinator, job_id: uuid::Uuid) -> JobStatus {
    tokio::time::timeout(Duration::from_secs(20), coordinator.wait_for_job(job_id))
        .await
        .expect("job finished in time")
        .expect("job known")
}

#[tokio::test]
async fn three_videos_all_download() {
    let (tx, mut rx) = mpsc::channel(64);
    let e = engine(Some(tx)).await;
    let ids = ["aaaaaaaaaa1", "bbbbbbbbbb2", "cccccccccc3"];

    let created = e
        .coordinator
        .create_job("default", &common::watch_urls(&ids))
        .await
        .unwrap();
    let job_id = created.value.id;
    assert_eq!(finished(&e.coordinator, job_id).await, JobStatus::Completed);

    let job = e.store.find_job(job_id).await.unwrap().expect("job persisted");
    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(job.tasks().len(), 3);
    for task in job.tasks() {
        assert_eq!(task.status, TaskStatus::Succeeded);
        let path = task.file_path.as_ref().expect("file path");
        assert_eq!(path, &e.download_dir.join(format!("{}.mp4", task.video_id)));
        assert!(path.exists());
        assert_eq!(task.file_size, Some(std::fs::metadata(path).unwrap().len()));
    }

    let mut saw_progress = false;
    while let Ok(p) = rx.try_recv() {
        saw_progress |= p.bytes_done > 0;
    }
    assert!(saw_progress, "progress reported from the subprocess");
}

#[tokio::test]
async fn one_failing_video_makes_job_partial() {
    let e = engine(None).await;
    let created = e
        .coordinator
        .create_job("default", &common::watch_urls(&["okokokokok1", "failfail001"]))
        .await
        .unwrap();
    let job_id = created.value.id;
    assert_eq!(finished(&e.coordinator, job_id).await, JobStatus::PartiallyCompleted);

    let job = e.store.find_job(job_id).await.unwrap().unwrap();
    let failed = job.tasks().iter().find(|t| t.video_id == "failfail001").unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed.file_path.is_none());
    assert!(failed
        .error_message
        .as_deref()
        .unwrap()
        .contains("Video unavailable"));
    let ok = job.tasks().iter().find(|t| t.video_id == "okokokokok1").unwrap();
    assert_eq!(ok.status, TaskStatus::Succeeded);

    // Retrying creates a new job for the failed video only.
    let retry = e.coordinator.retry_failed(job_id).await.unwrap().value;
    assert_ne!(retry.id, job_id);
    assert_eq!(retry.tasks().len(), 1);
    assert_eq!(retry.tasks()[0].video_id, "failfail001");
    assert_eq!(finished(&e.coordinator, retry.id).await, JobStatus::Failed);
}

#[tokio::test]
async fn auto_remove_deletes_completed_jobs_only() {
    let e = engine(None).await;
    let mut events = e.coordinator.subscribe();

    let done = e
        .coordinator
        .create_job("cleanup", &common::watch_urls(&["keepfile001"]))
        .await
        .unwrap()
        .value
        .id;
    // The job may be gone before anyone waits on it, so follow the event stream.
    tokio::time::timeout(Duration::from_secs(20), async {
        loop {
            match events.recv().await {
                Ok(JobEvent::JobRemoved { job_id }) if job_id == done => break,
                Ok(JobEvent::JobStatusChanged { job_id, status }) if job_id == done => {
                    assert_ne!(status, JobStatus::Failed);
                }
                Ok(_) => {}
                Err(e) => panic!("event stream closed: {e}"),
            }
        }
    })
    .await
    .expect("job removed in time");
    assert!(e.store.find_job(done).await.unwrap().is_none());
    assert!(e.download_dir.join("keepfile001.mp4").exists());

    let failed = e
        .coordinator
        .create_job("cleanup", &common::watch_urls(&["failfail002"]))
        .await
        .unwrap()
        .value
        .id;
    assert_eq!(finished(&e.coordinator, failed).await, JobStatus::Failed);
    let kept = e.store.find_job(failed).await.unwrap().expect("failed job kept");
    assert_eq!(kept.status(), JobStatus::Failed);
}
