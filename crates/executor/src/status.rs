use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a job tracked by the queue.
///
/// Transitions only move forward: `Pending -> Running -> {Done | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted by `enqueue`, not yet picked up by a worker.
    Pending,
    /// A worker is executing (or waiting to retry) the job.
    Running,
    /// The job succeeded.
    Done,
    /// Every attempt failed.
    Failed,
}

impl JobState {
    /// Returns `true` for `Done` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Lowercase name as used in logs and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a job's status as returned by
/// [`JobQueue::status`](crate::JobQueue::status).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    /// Number of `run` invocations so far.
    pub attempts: u32,
    /// Message of the final failing attempt; set only when `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl JobStatus {
    pub(crate) fn pending() -> Self {
        Self {
            state: JobState::Pending,
            attempts: 0,
            last_error: None,
        }
    }
}
