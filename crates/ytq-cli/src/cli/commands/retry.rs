//! `ytq retry <id>` – new job from the failed tasks of a finished job.

use anyhow::Result;
use uuid::Uuid;
use ytq_core::model::JobStatus;

use super::until_finished;
use crate::cli::app::App;
use crate::cli::output::{print_job, Output};

pub async fn run_retry(app: &App, out: &Output, id: Uuid) -> Result<()> {
    let result = match app.coordinator.retry_failed(id).await {
        Ok(retry) => until_finished(app, retry).await,
        Err(e) => Err(e),
    };
    let job = out.report(result, |job| {
        println!("Retry of job {id}:");
        print_job(job);
    })?;
    if job.status() == JobStatus::Failed {
        anyhow::bail!("retry job {} failed", job.id);
    }
    Ok(())
}
