//! `ytq daemon` – recover interrupted jobs, run the fetch scheduler and the
//! control socket until Ctrl-C.

use anyhow::Result;
use tokio::sync::watch;
use ytq_core::control::default_control_socket_path;

use crate::cli::app::App;
use crate::cli::control_socket;

pub async fn run_daemon(app: &App, scheduler: Option<String>) -> Result<()> {
    let recovered = app.coordinator.recover_jobs().await?;
    for w in &recovered.warnings {
        tracing::warn!("recovery: {}", w);
    }
    if recovered.value > 0 {
        tracing::info!("recovered {} job(s) from previous run", recovered.value);
    }

    let scheduler = match app.scheduler(scheduler.as_deref()) {
        Ok(s) => Some(s),
        Err(e) if app.config.api_key().is_none() => {
            tracing::warn!("fetch scheduler disabled: {:#}", e);
            eprintln!("warning: fetch scheduler disabled: {e:#}");
            None
        }
        Err(e) => return Err(e),
    };

    let (stop_tx, stop_rx) = watch::channel(false);
    let timer = scheduler.as_ref().map(|s| s.spawn(stop_rx));

    let socket_path = default_control_socket_path()?;
    let listener = control_socket::spawn_control_listener(
        app.coordinator.clone(),
        scheduler.clone(),
        &socket_path,
    )?;
    tracing::info!(path = %socket_path.display(), "daemon running");
    println!("ytq daemon running (control socket {}). Ctrl-C to stop.", socket_path.display());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    listener.abort();
    let _ = std::fs::remove_file(&socket_path);
    let _ = stop_tx.send(true);
    if let Some(timer) = timer {
        let _ = timer.await;
    }
    // Queued tasks are failed; running downloads finish.
    app.coordinator.shutdown(false).await;
    Ok(())
}
