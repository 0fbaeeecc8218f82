//! Task executor: one yt-dlp subprocess per task.
//!
//! The executor never returns an error. Spawn failures, non-zero exits and
//! missing output files all become a failed `DownloadResult`.

mod args;
mod output;

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::config::DownloaderConfig;
use crate::model::{DownloadResult, TaskProgress, TaskSpec};

pub use args::build_args;
pub use output::{classify, OutputLine};

/// Non-diagnostic stderr lines kept for the failure message.
const STDERR_TAIL_LINES: usize = 20;

#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Run one task to completion. Progress is best-effort: snapshots are dropped
    /// when the receiver lags.
    async fn execute(
        &self,
        task: &TaskSpec,
        config: &DownloaderConfig,
        progress: Option<&mpsc::Sender<TaskProgress>>,
    ) -> DownloadResult;
}

/// Runs the configured yt-dlp binary.
#[derive(Debug, Clone)]
pub struct YtDlpExecutor {
    binary: PathBuf,
    download_folder: PathBuf,
}

impl YtDlpExecutor {
    pub fn new(binary: impl Into<PathBuf>, download_folder: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            download_folder: download_folder.into(),
        }
    }

    pub fn download_folder(&self) -> &Path {
        &self.download_folder
    }
}

#[derive(Debug, Default)]
struct Captured {
    warnings: Vec<String>,
    errors: Vec<String>,
    tail: VecDeque<String>,
    output_file: Option<PathBuf>,
}

async fn read_stream<R>(
    stream: R,
    task: TaskSpec,
    progress: Option<mpsc::Sender<TaskProgress>>,
) -> Captured
where
    R: AsyncRead + Unpin,
{
    let mut captured = Captured::default();
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        // Lossy decode: a non-UTF-8 line never stops the drain.
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(task_id = %task.task_id, "read yt-dlp output: {}", e);
                break;
            }
        }
        let decoded = String::from_utf8_lossy(&buf);
        let line = decoded.trim_end_matches(['\n', '\r']);
        match classify(line) {
            OutputLine::Progress {
                bytes_done,
                total_bytes,
            } => {
                if let Some(tx) = &progress {
                    let _ = tx.try_send(TaskProgress {
                        task_id: task.task_id,
                        video_id: task.video_id.clone(),
                        bytes_done,
                        total_bytes,
                    });
                }
            }
            OutputLine::Warning(w) => {
                tracing::debug!(task_id = %task.task_id, "yt-dlp warning: {}", w);
                captured.warnings.push(w);
            }
            OutputLine::Error(e) => captured.errors.push(e),
            OutputLine::OutputFile(path) => captured.output_file = Some(path),
            OutputLine::Other => {
                let line = line.trim();
                if !line.is_empty() {
                    if captured.tail.len() == STDERR_TAIL_LINES {
                        captured.tail.pop_front();
                    }
                    captured.tail.push_back(line.to_string());
                }
            }
        }
    }
    captured
}

#[async_trait]
impl TaskExecutor for YtDlpExecutor {
    async fn execute(
        &self,
        task: &TaskSpec,
        config: &DownloaderConfig,
        progress: Option<&mpsc::Sender<TaskProgress>>,
    ) -> DownloadResult {
        if task.video_id.trim().is_empty() {
            return DownloadResult::failed(&task.video_id, "empty video id");
        }
        if let Err(e) = tokio::fs::create_dir_all(&self.download_folder).await {
            return DownloadResult::failed(
                &task.video_id,
                format!(
                    "create download folder {}: {}",
                    self.download_folder.display(),
                    e
                ),
            );
        }

        let args = build_args(&task.video_id, config, &self.download_folder);
        tracing::debug!(task_id = %task.task_id, video_id = %task.video_id, ?args, "spawning yt-dlp");

        let mut child = match Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(video_id = %task.video_id, "failed to start {}: {}", self.binary.display(), e);
                return DownloadResult::failed(
                    &task.video_id,
                    format!("failed to start {}: {}", self.binary.display(), e),
                );
            }
        };

        let stdout = child
            .stdout
            .take()
            .map(|s| tokio::spawn(read_stream(s, task.clone(), progress.cloned())));
        let stderr = child
            .stderr
            .take()
            .map(|s| tokio::spawn(read_stream(s, task.clone(), progress.cloned())));

        let status = child.wait().await;

        let mut captured = Captured::default();
        let mut stderr_tail = VecDeque::new();
        if let Some(handle) = stdout {
            if let Ok(out) = handle.await {
                captured.warnings.extend(out.warnings);
                captured.errors.extend(out.errors);
                captured.output_file = out.output_file;
            }
        }
        if let Some(handle) = stderr {
            if let Ok(err) = handle.await {
                captured.warnings.extend(err.warnings);
                captured.errors.extend(err.errors);
                stderr_tail = err.tail;
                if captured.output_file.is_none() {
                    captured.output_file = err.output_file;
                }
            }
        }

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                return DownloadResult::failed(&task.video_id, format!("wait for yt-dlp: {e}"))
                    .with_warnings(captured.warnings)
            }
        };

        if !status.success() {
            let message = if !captured.errors.is_empty() {
                captured.errors.join("\n")
            } else if !stderr_tail.is_empty() {
                Vec::from(stderr_tail).join("\n")
            } else {
                format!("yt-dlp exited with {status}")
            };
            tracing::info!(video_id = %task.video_id, %status, "download failed");
            return DownloadResult::failed(&task.video_id, message).with_warnings(captured.warnings);
        }

        let Some(path) = captured.output_file else {
            return DownloadResult::failed(
                &task.video_id,
                "yt-dlp exited successfully but reported no output file",
            )
            .with_warnings(captured.warnings);
        };
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                tracing::info!(video_id = %task.video_id, file = %path.display(), size = meta.len(), "download finished");
                DownloadResult::succeeded(&task.video_id, path, meta.len())
                    .with_warnings(captured.warnings)
            }
            _ => DownloadResult::failed(
                &task.video_id,
                format!("output file not found: {}", path.display()),
            )
            .with_warnings(captured.warnings),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use uuid::Uuid;

    fn spec(video_id: &str) -> TaskSpec {
        TaskSpec {
            job_id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            video_id: video_id.to_string(),
        }
    }

    /// Writes an executable shell script standing in for yt-dlp.
    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn missing_binary_is_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        let exec = YtDlpExecutor::new(dir.path().join("nope"), dir.path().join("dl"));
        let r = exec
            .execute(&spec("abcdefghijk"), &DownloaderConfig::default(), None)
            .await;
        assert!(!r.success());
        assert!(r.error_message().unwrap().contains("failed to start"));
    }

    #[tokio::test]
    async fn empty_video_id_never_spawns() {
        let exec = YtDlpExecutor::new("/definitely/missing", "/tmp");
        let r = exec.execute(&spec(""), &DownloaderConfig::default(), None).await;
        assert_eq!(r.error_message(), Some("empty video id"));
    }

    #[tokio::test]
    async fn success_reports_file_size_progress_and_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let dl = dir.path().join("dl");
        let out = dl.join("clip.mp4");
        let bin = script(
            dir.path(),
            &format!(
                "echo 'ytq-progress 5 10 NA'\necho 'WARNING: slow network' >&2\nprintf 'hello' > '{0}'\necho 'ytq-file {0}'\nexit 0",
                out.display()
            ),
        );
        let exec = YtDlpExecutor::new(bin, &dl);
        let (tx, mut rx) = mpsc::channel(16);
        let r = exec
            .execute(&spec("abcdefghijk"), &DownloaderConfig::default(), Some(&tx))
            .await;
        assert!(r.success(), "{r:?}");
        assert_eq!(r.file_size(), Some(5));
        assert_eq!(r.file_path(), Some(out.as_path()));
        assert_eq!(r.warnings, vec!["slow network".to_string()]);
        let p = rx.try_recv().unwrap();
        assert_eq!(p.bytes_done, 5);
        assert_eq!(p.fraction(), Some(0.5));
    }

    #[tokio::test]
    async fn non_utf8_output_still_finds_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let dl = dir.path().join("dl");
        let out = dl.join("cafe.mp4");
        let bin = script(
            dir.path(),
            &format!(
                "printf 'data' > '{0}'\nprintf '[download] Caf\\351 title\\n'\nprintf 'WARNING: caf\\351\\n' >&2\necho 'ytq-file {0}'\nexit 0",
                out.display()
            ),
        );
        let exec = YtDlpExecutor::new(bin, &dl);
        let r = exec
            .execute(&spec("abcdefghijk"), &DownloaderConfig::default(), None)
            .await;
        assert!(r.success(), "{r:?}");
        assert_eq!(r.file_path(), Some(out.as_path()));
        assert_eq!(r.file_size(), Some(4));
        assert_eq!(r.warnings, vec!["caf\u{FFFD}".to_string()]);
    }

    #[tokio::test]
    async fn zero_exit_without_file_marker_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(dir.path(), "echo '[download] 100% of 1.00MiB'\nexit 0");
        let exec = YtDlpExecutor::new(bin, dir.path().join("dl"));
        let r = exec
            .execute(&spec("abcdefghijk"), &DownloaderConfig::default(), None)
            .await;
        assert!(!r.success());
        assert!(r.file_path().is_none());
        assert!(r
            .error_message()
            .unwrap()
            .contains("reported no output file"));
    }

    #[tokio::test]
    async fn nonzero_exit_prefers_error_lines() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(
            dir.path(),
            "echo 'some noise' >&2\necho 'ERROR: [youtube] abc: Video unavailable' >&2\nexit 1",
        );
        let exec = YtDlpExecutor::new(bin, dir.path().join("dl"));
        let r = exec
            .execute(&spec("abcdefghijk"), &DownloaderConfig::default(), None)
            .await;
        assert_eq!(
            r.error_message(),
            Some("ERROR: [youtube] abc: Video unavailable")
        );
    }

    #[tokio::test]
    async fn nonzero_exit_without_output_uses_status() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(dir.path(), "exit 3");
        let exec = YtDlpExecutor::new(bin, dir.path().join("dl"));
        let r = exec
            .execute(&spec("abcdefghijk"), &DownloaderConfig::default(), None)
            .await;
        assert!(r.error_message().unwrap().contains("exited with"));
    }

    #[tokio::test]
    async fn zero_exit_without_file_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(dir.path(), "echo 'ytq-file /nonexistent/file.mp4'\nexit 0");
        let exec = YtDlpExecutor::new(bin, dir.path().join("dl"));
        let r = exec
            .execute(&spec("abcdefghijk"), &DownloaderConfig::default(), None)
            .await;
        assert!(!r.success());
        assert!(r.error_message().unwrap().contains("output file not found"));
    }
}
