//! Coordinator results: a value with warnings, or an error with a stable code.

use serde::Serialize;

use crate::config::ConfigError;
use crate::model::{JobId, JobStatus, TaskId};

/// Successful outcome plus non-fatal warnings (skipped URLs, rejected tasks...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reported<T> {
    pub value: T,
    pub warnings: Vec<String>,
}

impl<T> Reported<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<String>) -> Self {
        Self { value, warnings }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reported<U> {
        Reported {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no downloadable video in the request")]
    NoVideos,
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
    #[error("cannot {action} job {job_id} in state {status}")]
    InvalidState {
        job_id: JobId,
        status: JobStatus,
        action: &'static str,
    },
    #[error("job {0} has no failed task to retry")]
    NothingToRetry(JobId),
    #[error("store error: {0}")]
    Store(String),
}

impl CoordinatorError {
    /// Stable machine-readable code for the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            CoordinatorError::Config(ConfigError::Invalid(_)) => "INVALID_CONFIG",
            CoordinatorError::Config(_) => "CONFIG_NOT_FOUND",
            CoordinatorError::NoVideos => "NO_VIDEOS",
            CoordinatorError::JobNotFound(_) => "JOB_NOT_FOUND",
            CoordinatorError::TaskNotFound(_) => "TASK_NOT_FOUND",
            CoordinatorError::InvalidState { .. } => "INVALID_STATE",
            CoordinatorError::NothingToRetry(_) => "NOTHING_TO_RETRY",
            CoordinatorError::Store(_) => "STORE_ERROR",
        }
    }

    pub(crate) fn store(err: anyhow::Error) -> Self {
        CoordinatorError::Store(format!("{err:#}"))
    }
}
