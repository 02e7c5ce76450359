//! Built-in job types.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::debug;

use inboxproxy_core::JobId;

use crate::error::JobError;
use crate::job::Job;

/// Writes a byte buffer to a file, replacing any previous content.
#[derive(Debug, Clone)]
pub struct SaveFileJob {
    id: JobId,
    path: PathBuf,
    data: Vec<u8>,
}

impl SaveFileJob {
    /// Create a job with a fresh random id.
    pub fn new(path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: JobId::random(),
            path: path.into(),
            data: data.into(),
        }
    }

    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Job for SaveFileJob {
    fn id(&self) -> &JobId {
        &self.id
    }

    async fn run(&self) -> Result<(), JobError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, &self.data).await?;
        debug!(job_id = %self.id, path = %self.path.display(), bytes = self.data.len(), "file written");
        Ok(())
    }
}

type Callback = Box<dyn Fn() -> BoxFuture<'static, Result<(), JobError>> + Send + Sync>;

/// Runs an arbitrary async closure.
///
/// The closure is invoked once per attempt, so it must be callable more than
/// once.
pub struct CallbackJob {
    id: JobId,
    callback: Callback,
}

impl CallbackJob {
    /// Create a job with a fresh random id.
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        Self::with_id(JobId::random(), callback)
    }

    /// Create a job with a caller-chosen id.
    pub fn with_id<F, Fut>(id: impl Into<JobId>, callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        Self {
            id: id.into(),
            callback: Box::new(move || Box::pin(callback())),
        }
    }
}

impl fmt::Debug for CallbackJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackJob")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Job for CallbackJob {
    fn id(&self) -> &JobId {
        &self.id
    }

    async fn run(&self) -> Result<(), JobError> {
        (self.callback)().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn save_file_job_writes_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/meta.json");
        let job = SaveFileJob::new(&path, b"{}".to_vec());

        job.run().await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
        assert_eq!(job.path(), path.as_path());
    }

    #[tokio::test]
    async fn save_file_job_reports_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        // Target is an existing directory, so the write must fail.
        let job = SaveFileJob::new(dir.path(), b"x".to_vec());
        assert!(matches!(job.run().await, Err(JobError::Io(_))));
    }

    #[test]
    fn save_file_jobs_get_distinct_ids() {
        let a = SaveFileJob::new("a", Vec::new());
        let b = SaveFileJob::new("a", Vec::new());
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn callback_job_runs_closure_each_time() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let job = CallbackJob::with_id("hook-1", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        job.run().await.unwrap();
        job.run().await.unwrap();

        assert_eq!(job.id().as_str(), "hook-1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn callback_job_propagates_error() {
        let job = CallbackJob::new(|| async { Err(JobError::msg("nope")) });
        let err = job.run().await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}
