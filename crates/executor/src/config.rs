use std::path::PathBuf;
use std::time::Duration;

use crate::error::QueueError;

/// Configuration for the [`JobQueue`](crate::JobQueue).
///
/// # Examples
///
/// ```
/// use inboxproxy_executor::QueueConfig;
///
/// let config = QueueConfig::default();
/// assert_eq!(config.max_retries, 3);
/// assert_eq!(config.channel_capacity(), 8);
/// ```
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Number of worker tasks.
    pub workers: usize,
    /// Retries after the first attempt; a job runs at most `max_retries + 1`
    /// times.
    pub max_retries: u32,
    /// Fixed delay between a failed attempt and the next one.
    pub retry_delay: Duration,
    /// Append-only file receiving one line per terminally failed job.
    pub failure_log: PathBuf,
}

impl QueueConfig {
    /// Capacity of the work channel; `enqueue` waits once it is full.
    pub fn channel_capacity(&self) -> usize {
        self.workers.saturating_mul(2)
    }

    /// Reject configurations the queue cannot run with.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.workers == 0 {
            return Err(QueueError::InvalidConfig(
                "workers must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            failure_log: PathBuf::from("failures.log"),
        }
    }
}
