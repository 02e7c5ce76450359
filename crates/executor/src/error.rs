use std::path::PathBuf;

use thiserror::Error;

/// Error returned by a single [`Job::run`](crate::Job::run) attempt.
///
/// The `Display` output is what ends up in the job status and the failure
/// log, so [`JobError::Failed`] renders as the bare message.
#[derive(Debug, Error)]
pub enum JobError {
    /// A failure described only by its message.
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl JobError {
    /// Build a [`JobError::Failed`] from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Wrap any error type.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(err))
    }
}

/// Errors from queue construction and submission.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue has been closed and accepts no more jobs.
    #[error("job queue is closed")]
    Closed,

    #[error("invalid queue configuration: {0}")]
    InvalidConfig(String),

    /// The failure log could not be opened.
    #[error("failed to open failure log {}: {source}", .path.display())]
    FailureLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
