//! `ytq remove <id>` and `ytq remove-task <task-id>`.

use anyhow::Result;
use uuid::Uuid;

use crate::cli::app::App;
use crate::cli::output::{print_job, Output};

pub async fn run_remove(app: &App, out: &Output, id: Uuid) -> Result<()> {
    out.report(app.coordinator.remove_job(id).await, |_| {
        println!("Removed job {id}");
    })?;
    Ok(())
}

pub async fn run_remove_task(app: &App, out: &Output, task_id: Uuid) -> Result<()> {
    out.report(app.coordinator.delete_task(task_id).await, |job| {
        println!("Removed task {task_id}");
        print_job(job);
    })?;
    Ok(())
}
