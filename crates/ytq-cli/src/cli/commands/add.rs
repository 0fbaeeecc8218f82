//! `ytq add <url>...` – create a job and, when it starts automatically, run it.

use anyhow::Result;
use ytq_core::model::JobStatus;

use super::until_finished;
use crate::cli::app::App;
use crate::cli::output::{print_job, Output};

pub async fn run_add(app: &App, out: &Output, config_name: &str, urls: &[String]) -> Result<()> {
    let created = match app.coordinator.create_job(config_name, urls).await {
        Ok(created) => until_finished(app, created).await,
        Err(e) => Err(e),
    };
    let job = out.report(created, |job| {
        if job.status() == JobStatus::Pending {
            println!("Added job {} (pending). Start it with: ytq start {}", job.id, job.id);
        } else {
            print_job(job);
        }
    })?;
    if job.status() == JobStatus::Failed {
        anyhow::bail!("job {} failed", job.id);
    }
    Ok(())
}
