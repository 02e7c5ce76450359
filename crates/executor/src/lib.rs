pub mod config;
pub mod error;
pub mod failure;
pub mod job;
pub mod jobs;
pub mod queue;
pub mod status;

pub use config::QueueConfig;
pub use error::{JobError, QueueError};
pub use failure::{FailureSink, FileFailureLog, MemoryFailureLog};
pub use job::Job;
pub use jobs::{CallbackJob, SaveFileJob};
pub use queue::JobQueue;
pub use status::{JobState, JobStatus};
