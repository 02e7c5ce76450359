use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use inboxproxy_core::JobId;

use crate::config::QueueConfig;
use crate::error::{JobError, QueueError};
use crate::failure::{FailureSink, FileFailureLog};
use crate::job::Job;
use crate::status::{JobState, JobStatus};

type JobReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<Box<dyn Job>>>>;

/// Bounded worker pool that runs [`Job`]s with retry and failure auditing.
///
/// A fixed number of worker tasks pull from one shared channel holding at
/// most `2 * workers` jobs, so [`enqueue`](Self::enqueue) waits once
/// producers outrun the workers. Each job is attempted until it succeeds or
/// has run `max_retries + 1` times, sleeping a fixed delay between attempts.
/// Jobs that never succeed are marked [`JobState::Failed`] and written to the
/// failure sink.
///
/// Statuses are kept for the lifetime of the queue so callers can poll them
/// after completion. There is no per-attempt timeout: a job that never
/// returns occupies its worker forever.
pub struct JobQueue {
    shared: Arc<Shared>,
    sender: Mutex<Option<mpsc::Sender<Box<dyn Job>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    /// Held for the whole of `close`.
    closing: tokio::sync::Mutex<()>,
}

/// State shared between the queue handle and its workers.
struct Shared {
    statuses: Mutex<HashMap<JobId, JobStatus>>,
    /// Jobs enqueued but not yet terminal.
    outstanding: watch::Sender<usize>,
    failures: Arc<dyn FailureSink>,
    max_retries: u32,
    retry_delay: Duration,
}

impl JobQueue {
    /// Open the failure log named in `config` and start the workers.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn new(config: QueueConfig) -> Result<Self, QueueError> {
        config.validate()?;
        let log = FileFailureLog::open(&config.failure_log)
            .await
            .map_err(|source| QueueError::FailureLog {
                path: config.failure_log.clone(),
                source,
            })?;
        Self::with_failure_sink(config, Arc::new(log))
    }

    /// Start the workers using a caller-supplied failure sink.
    ///
    /// `config.failure_log` is ignored. Must be called from within a Tokio
    /// runtime.
    pub fn with_failure_sink(
        config: QueueConfig,
        failures: Arc<dyn FailureSink>,
    ) -> Result<Self, QueueError> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.channel_capacity());
        let rx: JobReceiver = Arc::new(tokio::sync::Mutex::new(rx));
        let (outstanding, _) = watch::channel(0);

        let shared = Arc::new(Shared {
            statuses: Mutex::new(HashMap::new()),
            outstanding,
            failures,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        });

        let workers = (0..config.workers)
            .map(|index| tokio::spawn(worker_loop(index, Arc::clone(&rx), Arc::clone(&shared))))
            .collect();

        info!(
            workers = config.workers,
            max_retries = config.max_retries,
            retry_delay_ms = %config.retry_delay.as_millis(),
            "job queue started"
        );

        Ok(Self {
            shared,
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            closing: tokio::sync::Mutex::new(()),
        })
    }

    /// Submit a job for execution and return its id.
    ///
    /// Waits while the channel is full. Once a slot is reserved the job is
    /// registered as [`JobState::Pending`] and handed over, so
    /// [`status`](Self::status) finds it as soon as this method returns.
    /// Dropping the future while it waits leaves the queue untouched.
    /// Re-using an id that the queue already knows resets that status to
    /// pending.
    ///
    /// Returns [`QueueError::Closed`] once [`close`](Self::close) has been
    /// called.
    pub async fn enqueue(&self, job: Box<dyn Job>) -> Result<JobId, QueueError> {
        let sender = self.sender.lock().clone();
        let Some(sender) = sender else {
            return Err(QueueError::Closed);
        };
        let permit = sender.reserve().await.map_err(|_| QueueError::Closed)?;

        let id = job.id().clone();
        self.shared
            .statuses
            .lock()
            .insert(id.clone(), JobStatus::pending());
        self.shared.outstanding.send_modify(|n| *n += 1);
        permit.send(job);

        debug!(job_id = %id, "job enqueued");
        Ok(id)
    }

    /// Current status of a job, or `None` if the id was never enqueued.
    pub fn status(&self, id: &JobId) -> Option<JobStatus> {
        self.shared.statuses.lock().get(id).cloned()
    }

    /// Number of jobs enqueued that have not reached a terminal state.
    pub fn len_outstanding(&self) -> usize {
        *self.shared.outstanding.borrow()
    }

    /// Wait until every job enqueued so far has reached a terminal state.
    ///
    /// Jobs enqueued while waiting are waited for as well.
    pub async fn wait(&self) {
        let mut rx = self.shared.outstanding.subscribe();
        // The sender lives in `self.shared`, so this cannot observe a closed
        // channel.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Stop accepting jobs, drain the ones already queued, join the workers
    /// and close the failure sink.
    ///
    /// Concurrent and repeated calls all return only after the drain has
    /// finished.
    pub async fn close(&self) {
        let _closing = self.closing.lock().await;
        drop(self.sender.lock().take());

        let workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            return;
        }
        for handle in workers {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task ended abnormally");
            }
        }

        if let Err(e) = self.shared.failures.close().await {
            warn!(error = %e, "failed to close failure log");
        }
        info!("job queue closed");
    }
}

impl Shared {
    fn update(&self, id: &JobId, f: impl FnOnce(&mut JobStatus)) {
        if let Some(status) = self.statuses.lock().get_mut(id) {
            f(status);
        }
    }

    fn finish_one(&self) {
        self.outstanding.send_modify(|n| *n = n.saturating_sub(1));
    }

    /// Run one job to a terminal state.
    #[instrument(skip(self, job), fields(job_id = %job.id()))]
    async fn execute(&self, job: &dyn Job) {
        let id = job.id().clone();
        self.update(&id, |s| s.state = JobState::Running);

        let mut attempts = 0u32;
        let result = loop {
            attempts += 1;
            self.update(&id, |s| s.attempts = attempts);
            debug!(attempt = attempts, max_retries = self.max_retries, "running job");

            match run_attempt(job).await {
                Ok(()) => break Ok(()),
                Err(err) if attempts > self.max_retries => break Err(err),
                Err(err) => {
                    warn!(
                        attempt = attempts,
                        error = %err,
                        delay_ms = %self.retry_delay.as_millis(),
                        "job attempt failed, will retry"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        };

        match result {
            Ok(()) => {
                self.update(&id, |s| {
                    s.state = JobState::Done;
                    s.attempts = attempts;
                });
                debug!(attempts, "job done");
            }
            Err(err) => {
                let message = err.to_string();
                warn!(attempts, error = %message, "job failed, retries exhausted");
                self.update(&id, |s| {
                    s.state = JobState::Failed;
                    s.attempts = attempts;
                    s.last_error = Some(message.clone());
                });
                if let Err(e) = self.failures.record(&id, &message).await {
                    warn!(error = %e, "failed to append to failure log");
                }
            }
        }

        self.finish_one();
    }
}

/// One call to `run`, with a panic turned into an ordinary failure.
async fn run_attempt(job: &dyn Job) -> Result<(), JobError> {
    match AssertUnwindSafe(job.run()).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(JobError::msg("job panicked")),
    }
}

async fn worker_loop(index: usize, rx: JobReceiver, shared: Arc<Shared>) {
    debug!(worker = index, "worker started");
    loop {
        let next = rx.lock().await.recv().await;
        let Some(job) = next else {
            break;
        };
        shared.execute(job.as_ref()).await;
    }
    debug!(worker = index, "worker stopped");
}
