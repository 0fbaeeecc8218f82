//! CLI command handlers. Each command is in its own file.

mod add;
mod cancel;
mod channel;
mod daemon;
mod fetch;
mod remove;
mod reset;
mod retry;
mod start;
mod status;

pub use add::run_add;
pub use cancel::run_cancel;
pub use channel::run_channel;
pub use daemon::run_daemon;
pub use fetch::run_fetch;
pub use remove::{run_remove, run_remove_task};
pub use reset::run_reset;
pub use retry::run_retry;
pub use start::run_start;
pub use status::run_status;

use ytq_core::coordinator::{CoordinatorError, Reported};
use ytq_core::model::{DownloadJob, JobStatus};

use super::app::App;

/// Wait for a running job and return its final state, keeping earlier warnings.
/// Jobs that are not running are returned as they are.
pub(super) async fn until_finished(
    app: &App,
    job: Reported<DownloadJob>,
) -> Result<Reported<DownloadJob>, CoordinatorError> {
    if job.value.status() != JobStatus::Running {
        return Ok(job);
    }
    let finished = app.coordinator.wait_for_outcome(job.value.id).await?;
    Ok(Reported::with_warnings(finished, job.warnings))
}
