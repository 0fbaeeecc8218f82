//! `ytq fetch` – one discovery cycle, through the daemon when it runs.

use anyhow::Result;
use ytq_core::config::YtqConfig;
use ytq_core::control::{default_control_socket_path, ControlCommand};
use ytq_core::scheduler::CycleOutcome;

use super::cancel::daemon_reply;
use crate::cli::app::App;
use crate::cli::control_socket;
use crate::cli::output::Output;

pub async fn run_fetch(cfg: YtqConfig, out: &Output, scheduler: Option<String>) -> Result<()> {
    if scheduler.is_none() {
        if let Ok(socket_path) = default_control_socket_path() {
            if let Some(reply) = control_socket::send_command(&socket_path, &ControlCommand::Fetch).await? {
                return daemon_reply(out, reply);
            }
        }
    }

    let app = App::open(cfg, out).await?;
    let scheduler = app
        .scheduler(scheduler.as_deref())
        .map_err(|e| out.fail("INVALID_CONFIG", e))?;
    let outcome = scheduler.trigger_now().await;

    // Jobs created by the cycle run in this process; let them finish.
    app.coordinator.shutdown(true).await;

    let failed = match &outcome {
        CycleOutcome::Failed { message } => Some(message.clone()),
        _ => None,
    };
    out.value(outcome, |o| match o {
        CycleOutcome::Completed {
            channels,
            discovered,
            jobs_created,
            units_used,
        } => println!(
            "Checked {channels} channel(s): {discovered} new video(s), {jobs_created} job(s), {units_used} quota unit(s)"
        ),
        CycleOutcome::Skipped { reason } => println!("Fetch skipped: {reason}"),
        CycleOutcome::Failed { message } => println!("Fetch failed: {message}"),
    })?;
    match failed {
        Some(message) => anyhow::bail!("fetch failed: {message}"),
        None => Ok(()),
    }
}
