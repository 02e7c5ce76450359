use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use inboxproxy_attachments::{ChunkedWriter, Ingestor};
use inboxproxy_blob::{LocalObjectStore, ObjectStore};
use inboxproxy_core::AttachmentMetadata;
use inboxproxy_executor::{JobQueue, JobState, SaveFileJob};

use crate::config::InboxConfig;

/// Result of an `ingest` run.
#[derive(Debug)]
pub struct IngestReport {
    pub stored: Vec<AttachmentMetadata>,
    /// Input files that could not be ingested.
    pub failed: Vec<PathBuf>,
}

/// Ingest every message file, optionally writing the collected metadata to
/// `manifest`.
///
/// A file that fails is logged and recorded in the report; the remaining
/// files are still processed.
pub async fn run(
    config: &InboxConfig,
    files: &[PathBuf],
    manifest: Option<&Path>,
) -> anyhow::Result<IngestReport> {
    let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(&config.storage.directory));
    let writer = Arc::new(ChunkedWriter::new(store, config.chunk_policy()?)?);
    let queue = Arc::new(
        JobQueue::new(config.queue_config())
            .await
            .context("failed to start job queue")?,
    );
    let ingestor = Ingestor::new(writer, Arc::clone(&queue));

    let mut report = IngestReport {
        stored: Vec::new(),
        failed: Vec::new(),
    };

    for file in files {
        let outcome = match tokio::fs::read(file).await {
            Ok(raw) => ingestor.ingest(&raw).await.map_err(anyhow::Error::from),
            Err(e) => Err(anyhow::Error::from(e).context("failed to read message")),
        };
        match outcome {
            Ok(stored) => {
                info!(file = %file.display(), attachments = stored.len(), "message stored");
                report.stored.extend(stored);
            }
            Err(e) => {
                error!(file = %file.display(), error = %format!("{e:#}"), "ingestion failed");
                report.failed.push(file.clone());
            }
        }
    }

    let manifest_result = match manifest {
        Some(path) => write_manifest(&queue, path, &report.stored).await,
        None => Ok(()),
    };

    queue.close().await;
    manifest_result?;
    Ok(report)
}

async fn write_manifest(
    queue: &JobQueue,
    path: &Path,
    stored: &[AttachmentMetadata],
) -> anyhow::Result<()> {
    let body = serde_json::to_vec_pretty(stored)?;
    let id = queue.enqueue(Box::new(SaveFileJob::new(path, body))).await?;
    queue.wait().await;

    match queue.status(&id) {
        Some(status) if status.state == JobState::Done => {
            info!(path = %path.display(), entries = stored.len(), "manifest written");
            Ok(())
        }
        status => anyhow::bail!(
            "failed to write manifest {}: {}",
            path.display(),
            status
                .and_then(|s| s.last_error)
                .unwrap_or_else(|| "unknown error".into())
        ),
    }
}
