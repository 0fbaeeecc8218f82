//! `ytq status [id]` – list jobs, or show one job with its tasks.

use anyhow::Result;
use uuid::Uuid;

use crate::cli::app::App;
use crate::cli::output::{print_job, print_summaries, Output};

pub async fn run_status(app: &App, out: &Output, id: Option<Uuid>) -> Result<()> {
    match id {
        Some(id) => {
            out.report(app.coordinator.get_job(id).await, print_job)?;
        }
        None => {
            out.report(app.coordinator.list_jobs().await, |jobs| print_summaries(jobs))?;
        }
    }
    Ok(())
}
