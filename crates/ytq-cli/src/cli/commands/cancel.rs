//! `ytq cancel <id>` – cancel through the daemon, or directly in the database.

use anyhow::Result;
use uuid::Uuid;
use ytq_core::config::YtqConfig;
use ytq_core::control::{default_control_socket_path, ControlCommand};

use crate::cli::app::App;
use crate::cli::control_socket;
use crate::cli::output::{print_job, Output};

pub async fn run_cancel(cfg: YtqConfig, out: &Output, id: Uuid) -> Result<()> {
    if let Ok(socket_path) = default_control_socket_path() {
        if let Some(reply) = control_socket::send_command(&socket_path, &ControlCommand::Cancel(id)).await? {
            return daemon_reply(out, reply);
        }
    }
    let app = App::open(cfg, out).await?;
    out.report(app.coordinator.cancel_job(id).await, print_job)?;
    Ok(())
}

pub(super) fn daemon_reply(out: &Output, reply: String) -> Result<()> {
    match reply.strip_prefix("error ") {
        Some(message) => Err(out.fail("DAEMON_ERROR", anyhow::anyhow!("daemon: {message}"))),
        None => {
            let message = reply.strip_prefix("ok ").unwrap_or(&reply).to_string();
            out.value(message, |m| println!("daemon: {m}"))
        }
    }
}
