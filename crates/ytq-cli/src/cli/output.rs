//! Human-readable or JSON-envelope output.

use anyhow::Result;
use serde::Serialize;
use ytq_core::coordinator::{CoordinatorError, Reported};
use ytq_core::envelope::Envelope;
use ytq_core::model::{DownloadJob, TaskStatus};
use ytq_core::store::{Channel, JobSummary};

#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Print a coordinator result. In human mode warnings go to stderr and
    /// `human` renders the value. A failure is returned so the process exits non-zero.
    pub fn report<T: Serialize>(
        &self,
        result: Result<Reported<T>, CoordinatorError>,
        human: impl FnOnce(&T),
    ) -> Result<T> {
        match result {
            Ok(reported) => {
                if self.json {
                    let env = Envelope::success(reported);
                    println!("{}", env.to_json()?);
                    // `success` always carries data.
                    env.data.ok_or_else(|| anyhow::anyhow!("empty envelope"))
                } else {
                    for w in &reported.warnings {
                        eprintln!("warning: {w}");
                    }
                    human(&reported.value);
                    Ok(reported.value)
                }
            }
            Err(e) => {
                if self.json {
                    println!("{}", Envelope::<()>::from_error(&e).to_json()?);
                }
                Err(anyhow::anyhow!("{} ({})", e, e.code()))
            }
        }
    }

    /// Print a plain value outside the coordinator (channels, reset, fetch).
    pub fn value<T: Serialize>(&self, value: T, human: impl FnOnce(&T)) -> Result<()> {
        self.report(Ok(Reported::new(value)), human).map(|_| ())
    }

    /// Report an application-level failure with an explicit code.
    pub fn fail(&self, code: &str, err: anyhow::Error) -> anyhow::Error {
        if self.json {
            let env = Envelope::<()>::failure(code, format!("{err:#}"));
            if let Ok(json) = env.to_json() {
                println!("{json}");
            }
        }
        err
    }
}

pub fn print_job(job: &DownloadJob) {
    println!(
        "job {}  {}  (config: {})",
        job.id,
        job.status(),
        job.config_name
    );
    println!("  {:<36} {:<10} {:<11} {}", "TASK", "STATUS", "VIDEO", "RESULT");
    for t in job.tasks() {
        let detail = match t.status {
            TaskStatus::Succeeded => t
                .file_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            TaskStatus::Failed => t.error_message.clone().unwrap_or_default(),
            _ => String::new(),
        };
        println!(
            "  {:<36} {:<10} {:<11} {}",
            t.id,
            t.status,
            t.video_id,
            detail
        );
    }
}

pub fn print_summaries(jobs: &[JobSummary]) {
    if jobs.is_empty() {
        println!("No jobs in database.");
        return;
    }
    println!(
        "{:<36} {:<20} {:<10} {:>5} {:>5} {:>5}",
        "ID", "STATUS", "CONFIG", "TASKS", "OK", "FAIL"
    );
    for j in jobs {
        println!(
            "{:<36} {:<20} {:<10} {:>5} {:>5} {:>5}",
            j.id,
            j.status,
            j.config_name,
            j.task_count,
            j.succeeded,
            j.failed
        );
    }
}

pub fn print_channels(channels: &[Channel]) {
    if channels.is_empty() {
        println!("No tracked channels.");
        return;
    }
    println!("{:<4} {:<26} {:<12} {}", "ID", "CHANNEL", "CONFIG", "TITLE");
    for c in channels {
        println!(
            "{:<4} {:<26} {:<12} {}",
            c.id,
            c.channel_id,
            c.config_name.as_deref().unwrap_or("-"),
            c.title.as_deref().unwrap_or("")
        );
    }
}
