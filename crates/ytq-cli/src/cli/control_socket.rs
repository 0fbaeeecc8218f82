//! Control socket: server (during `ytq daemon`) and client (`ytq cancel`, `ytq fetch`).
//! Protocol: one command line in, one reply line out (`ok …` or `error …`).

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use ytq_core::control::ControlCommand;
use ytq_core::coordinator::JobCoordinator;
use ytq_core::scheduler::FetchScheduler;

const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Spawns a task that listens on `path` and serves control commands until aborted.
pub fn spawn_control_listener(
    coordinator: JobCoordinator,
    scheduler: Option<FetchScheduler>,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("create dir: {}", dir.display()))?;
    }
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)
        .with_context(|| format!("bind control socket: {}", path.display()))?;

    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let coordinator = coordinator.clone();
                    let scheduler = scheduler.clone();
                    tokio::spawn(async move {
                        let (read, mut write) = stream.into_split();
                        let mut lines = BufReader::new(read).lines();
                        while let Ok(Some(line)) = lines.next_line().await {
                            let reply = handle_line(&coordinator, scheduler.as_ref(), &line).await;
                            if write.write_all(format!("{reply}\n").as_bytes()).await.is_err() {
                                break;
                            }
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

async fn handle_line(
    coordinator: &JobCoordinator,
    scheduler: Option<&FetchScheduler>,
    line: &str,
) -> String {
    let cmd = match ControlCommand::parse(line) {
        Ok(cmd) => cmd,
        Err(e) => return format!("error {e}"),
    };
    tracing::info!(command = %cmd.to_line(), "control command");
    match cmd {
        ControlCommand::Cancel(id) => match coordinator.cancel_job(id).await {
            Ok(r) => format!("ok job {} {}", id, r.value.status()),
            Err(e) => format!("error {e}"),
        },
        ControlCommand::Fetch => match scheduler {
            Some(s) => {
                // The cycle may take minutes; reply once it has been started.
                let s = s.clone();
                tokio::spawn(async move {
                    let outcome = s.trigger_now().await;
                    tracing::info!(?outcome, "manual fetch finished");
                });
                "ok fetch started".to_string()
            }
            None => "error no fetch scheduler configured".to_string(),
        },
    }
}

/// Sends `cmd` to a running daemon. Returns `Ok(None)` when no daemon listens.
pub async fn send_command(socket_path: &Path, cmd: &ControlCommand) -> Result<Option<String>> {
    if !socket_path.exists() {
        return Ok(None);
    }
    let stream = match UnixStream::connect(socket_path).await {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!(path = %socket_path.display(), "control socket connect: {}", e);
            return Ok(None);
        }
    };
    let (read, mut write) = stream.into_split();
    write.write_all(format!("{}\n", cmd.to_line()).as_bytes()).await?;
    let mut lines = BufReader::new(read).lines();
    let reply = tokio::time::timeout(REPLY_TIMEOUT, lines.next_line())
        .await
        .context("daemon did not reply")??
        .context("daemon closed the connection")?;
    Ok(Some(reply))
}
