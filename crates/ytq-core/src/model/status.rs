//! Job and task states, stored as strings in the database.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    PartiallyCompleted,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::PartiallyCompleted => "PARTIALLY_COMPLETED",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    /// Parse a stored status. Unknown strings map to `Failed`.
    pub fn from_str(s: &str) -> Self {
        match s {
            "PENDING" => JobStatus::Pending,
            "RUNNING" => JobStatus::Running,
            "PARTIALLY_COMPLETED" => JobStatus::PartiallyCompleted,
            "COMPLETED" => JobStatus::Completed,
            _ => JobStatus::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::PartiallyCompleted | JobStatus::Failed
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "QUEUED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Succeeded => "SUCCEEDED",
            TaskStatus::Failed => "FAILED",
        }
    }

    /// Parse a stored status. Unknown strings map to `Failed`.
    pub fn from_str(s: &str) -> Self {
        match s {
            "QUEUED" => TaskStatus::Queued,
            "RUNNING" => TaskStatus::Running,
            "SUCCEEDED" => TaskStatus::Succeeded,
            _ => TaskStatus::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Terminal job status derived from task statuses, or `None` while any task is
/// still queued or running.
///
/// An empty task set aggregates to `Completed`.
pub fn aggregate<I>(statuses: I) -> Option<JobStatus>
where
    I: IntoIterator<Item = TaskStatus>,
{
    let mut succeeded = 0usize;
    let mut failed = 0usize;
    for status in statuses {
        match status {
            TaskStatus::Succeeded => succeeded += 1,
            TaskStatus::Failed => failed += 1,
            TaskStatus::Queued | TaskStatus::Running => return None,
        }
    }
    Some(match (succeeded, failed) {
        (_, 0) => JobStatus::Completed,
        (0, _) => JobStatus::Failed,
        _ => JobStatus::PartiallyCompleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_string_roundtrip() {
        for s in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::PartiallyCompleted,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::from_str(s.as_str()), s);
        }
        for s in [
            TaskStatus::Queued,
            TaskStatus::Running,
            TaskStatus::Succeeded,
            TaskStatus::Failed,
        ] {
            assert_eq!(TaskStatus::from_str(s.as_str()), s);
        }
        assert_eq!(JobStatus::from_str("bogus"), JobStatus::Failed);
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&JobStatus::PartiallyCompleted).unwrap();
        assert_eq!(json, "\"PARTIALLY_COMPLETED\"");
    }

    #[test]
    fn aggregate_waits_for_all_tasks() {
        use TaskStatus::*;
        assert_eq!(aggregate([Succeeded, Running]), None);
        assert_eq!(aggregate([Queued, Failed]), None);
    }

    #[test]
    fn aggregate_over_every_terminal_mix() {
        use TaskStatus::*;
        // Every combination of up to 4 terminal tasks.
        for n in 1..=4usize {
            for mask in 0..(1u32 << n) {
                let statuses: Vec<TaskStatus> = (0..n)
                    .map(|i| if mask & (1 << i) != 0 { Succeeded } else { Failed })
                    .collect();
                let ok = statuses.iter().filter(|s| **s == Succeeded).count();
                let expected = if ok == n {
                    JobStatus::Completed
                } else if ok == 0 {
                    JobStatus::Failed
                } else {
                    JobStatus::PartiallyCompleted
                };
                assert_eq!(aggregate(statuses.clone()), Some(expected), "{statuses:?}");
            }
        }
    }

    #[test]
    fn aggregate_empty_is_completed() {
        assert_eq!(aggregate(Vec::new()), Some(JobStatus::Completed));
    }
}
