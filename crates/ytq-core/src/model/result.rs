//! What a worker is given (`TaskSpec`) and what it hands back (`DownloadResult`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{JobId, TaskId};

const GENERIC_FAILURE: &str = "download failed without an error message";

/// Everything a worker needs to run one task and report it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub job_id: JobId,
    pub task_id: TaskId,
    pub video_id: String,
}

/// Outcome of one download. A success always carries a file; a failure always
/// carries a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded { file_path: PathBuf, file_size: u64 },
    Failed { error_message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub video_id: String,
    #[serde(flatten)]
    outcome: Outcome,
    /// Non-fatal downloader warnings, in the order they were printed.
    pub warnings: Vec<String>,
}

impl DownloadResult {
    pub fn succeeded(video_id: impl Into<String>, file_path: PathBuf, file_size: u64) -> Self {
        Self {
            video_id: video_id.into(),
            outcome: Outcome::Succeeded {
                file_path,
                file_size,
            },
            warnings: Vec::new(),
        }
    }

    /// Failed result. A blank message is replaced with a generic one.
    pub fn failed(video_id: impl Into<String>, error_message: impl Into<String>) -> Self {
        let mut error_message = error_message.into();
        if error_message.trim().is_empty() {
            error_message = GENERIC_FAILURE.to_string();
        }
        Self {
            video_id: video_id.into(),
            outcome: Outcome::Failed { error_message },
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn success(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded { .. })
    }

    pub fn file_path(&self) -> Option<&Path> {
        match &self.outcome {
            Outcome::Succeeded { file_path, .. } => Some(file_path),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn file_size(&self) -> Option<u64> {
        match &self.outcome {
            Outcome::Succeeded { file_size, .. } => Some(*file_size),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failed { error_message } => Some(error_message),
            Outcome::Succeeded { .. } => None,
        }
    }
}
