//! CLI for the ytq download job engine.

mod app;
mod commands;
mod control_socket;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;
use ytq_core::config;

use app::App;
use output::Output;

/// Top-level CLI for ytq.
#[derive(Debug, Parser)]
#[command(name = "ytq")]
#[command(about = "ytq: YouTube download jobs on a worker pool, with quota-aware channel fetching", long_about = None)]
pub struct Cli {
    /// Print a JSON response envelope instead of human-readable output.
    #[arg(long, global = true)]
    pub json: bool,

    /// Read `KEY=VALUE` overrides from this file before the process environment.
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Create a download job from one or more YouTube URLs or video ids.
    Add {
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,
        /// Downloader configuration name.
        #[arg(long, short = 'c', default_value = config::DEFAULT_PROFILE)]
        config: String,
    },

    /// Start a pending job and wait for it to finish.
    Start { id: Uuid },

    /// Show all jobs, or one job with its tasks.
    Status { id: Option<Uuid> },

    /// Remove a job and its tasks.
    Remove { id: Uuid },

    /// Remove a single task from its job.
    RemoveTask { task_id: Uuid },

    /// Create a new job from the failed tasks of a finished job and run it.
    Retry { id: Uuid },

    /// Cancel the queued tasks of a job (through the daemon when it runs).
    Cancel { id: Uuid },

    /// Manage tracked channels.
    Channel {
        #[command(subcommand)]
        action: ChannelAction,
    },

    /// Run one discovery cycle now (through the daemon when it runs).
    Fetch {
        /// Scheduler configuration name (default: `active_scheduler`).
        #[arg(long)]
        scheduler: Option<String>,
    },

    /// Run the fetch scheduler and control socket until interrupted.
    Daemon {
        /// Scheduler configuration name (default: `active_scheduler`).
        #[arg(long)]
        scheduler: Option<String>,
    },

    /// Delete every job, task, channel and seen video.
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ChannelAction {
    /// Track a channel.
    Add {
        /// Channel id (`UC…`).
        channel_id: String,
        #[arg(long)]
        title: Option<String>,
        /// Downloader configuration for this channel's jobs.
        #[arg(long, short = 'c')]
        config: Option<String>,
    },
    /// Stop tracking a channel.
    Remove { channel_id: String },
    /// List tracked channels.
    List,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load(cli.env_file.as_deref())?;
        tracing::debug!("loaded config: {:?}", cfg);
        let out = Output::new(cli.json);

        match cli.command {
            CliCommand::Add { urls, config } => {
                let app = App::open(cfg, &out).await?;
                commands::run_add(&app, &out, &config, &urls).await?
            }
            CliCommand::Start { id } => {
                let app = App::open(cfg, &out).await?;
                commands::run_start(&app, &out, id).await?
            }
            CliCommand::Status { id } => {
                let app = App::open(cfg, &out).await?;
                commands::run_status(&app, &out, id).await?
            }
            CliCommand::Remove { id } => {
                let app = App::open(cfg, &out).await?;
                commands::run_remove(&app, &out, id).await?
            }
            CliCommand::RemoveTask { task_id } => {
                let app = App::open(cfg, &out).await?;
                commands::run_remove_task(&app, &out, task_id).await?
            }
            CliCommand::Retry { id } => {
                let app = App::open(cfg, &out).await?;
                commands::run_retry(&app, &out, id).await?
            }
            CliCommand::Cancel { id } => commands::run_cancel(cfg, &out, id).await?,
            CliCommand::Channel { action } => {
                let app = App::open(cfg, &out).await?;
                commands::run_channel(&app, &out, action).await?
            }
            CliCommand::Fetch { scheduler } => commands::run_fetch(cfg, &out, scheduler).await?,
            CliCommand::Daemon { scheduler } => {
                let app = App::open(cfg, &out).await?;
                commands::run_daemon(&app, scheduler).await?
            }
            CliCommand::Reset { yes } => {
                let app = App::open(cfg, &out).await?;
                commands::run_reset(&app, &out, yes).await?
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
