//! `ytq start <id>` – start a pending job and wait for it.

use anyhow::Result;
use uuid::Uuid;
use ytq_core::model::JobStatus;

use super::until_finished;
use crate::cli::app::App;
use crate::cli::output::{print_job, Output};

pub async fn run_start(app: &App, out: &Output, id: Uuid) -> Result<()> {
    let result = match app.coordinator.start_job(id).await {
        Ok(started) => until_finished(app, started).await,
        Err(e) => Err(e),
    };
    let job = out.report(result, print_job)?;
    if job.status() == JobStatus::Failed {
        anyhow::bail!("job {} failed", job.id);
    }
    Ok(())
}
