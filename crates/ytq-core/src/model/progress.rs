//! Progress snapshot for one running download.

use super::TaskId;

/// Emitted by the executor each time yt-dlp prints a progress line.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskProgress {
    pub task_id: TaskId,
    pub video_id: String,
    pub bytes_done: u64,
    /// Exact or estimated total size; None when yt-dlp does not know it yet.
    pub total_bytes: Option<u64>,
}

impl TaskProgress {
    /// Fraction complete in [0.0, 1.0]; None when the total is unknown.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(1.0),
            Some(total) => Some((self.bytes_done as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}
