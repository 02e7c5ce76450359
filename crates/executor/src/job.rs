use async_trait::async_trait;

use inboxproxy_core::JobId;

use crate::error::JobError;

/// A unit of work schedulable on the [`JobQueue`](crate::JobQueue).
///
/// The queue knows nothing about what a job does: it only reads the id and
/// calls [`run`](Job::run), possibly several times when attempts fail, so
/// `run` borrows the job rather than consuming it.
#[async_trait]
pub trait Job: Send + Sync {
    /// Identifier under which the queue tracks this job's status.
    fn id(&self) -> &JobId;

    /// Perform one attempt.
    async fn run(&self) -> Result<(), JobError>;
}
