//! Audit sinks for jobs that exhausted their retries.
//!
//! Each terminal failure produces one `"<job id>,<error message>"` line.
//! There is no rotation and no structured format.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use inboxproxy_core::JobId;

/// Destination for terminal-failure lines.
///
/// Implementations must be `Send + Sync` for use across worker tasks. The
/// queue treats every call as best-effort: errors are logged, never retried.
#[async_trait]
pub trait FailureSink: Send + Sync {
    /// Append one failure line.
    async fn record(&self, job_id: &JobId, message: &str) -> io::Result<()>;

    /// Release any underlying handle. Later `record` calls may fail.
    async fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Render the line written for a failed job, including the trailing newline.
///
/// Line breaks inside the message are flattened to spaces so that one
/// failure always occupies exactly one line.
pub fn format_line(job_id: &JobId, message: &str) -> String {
    let flat = message.replace(['\r', '\n'], " ");
    format!("{job_id},{flat}\n")
}

/// Append-only failure log backed by a file.
#[derive(Debug)]
pub struct FileFailureLog {
    path: PathBuf,
    file: tokio::sync::Mutex<Option<File>>,
}

impl FileFailureLog {
    /// Open (or create) the log at `path` in append mode, creating parent
    /// directories as needed.
    pub async fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: tokio::sync::Mutex::new(Some(file)),
        })
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FailureSink for FileFailureLog {
    async fn record(&self, job_id: &JobId, message: &str) -> io::Result<()> {
        let line = format_line(job_id, message);
        let mut guard = self.file.lock().await;
        let file = guard
            .as_mut()
            .ok_or_else(|| io::Error::other("failure log is closed"))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }

    async fn close(&self) -> io::Result<()> {
        let file = self.file.lock().await.take();
        match file {
            Some(file) => file.sync_all().await,
            None => Ok(()),
        }
    }
}

/// In-memory failure log. Suitable for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryFailureLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryFailureLog {
    /// Create a new empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded lines without their trailing newline, in append order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Number of recorded failures.
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    /// Returns `true` if nothing has failed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FailureSink for MemoryFailureLog {
    async fn record(&self, job_id: &JobId, message: &str) -> io::Result<()> {
        let mut line = format_line(job_id, message);
        line.pop();
        self.lines.lock().push(line);
        Ok(())
    }
}
