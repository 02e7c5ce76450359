use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use bytes::Bytes;

use inboxproxy_core::{AttachmentMetadata, JobId};
use inboxproxy_executor::{Job, JobError};

use crate::writer::ChunkedWriter;

/// Shared slot receiving the metadata of a successful [`StoreAttachmentJob`].
#[derive(Debug, Clone, Default)]
pub struct MetadataSlot(Arc<OnceLock<AttachmentMetadata>>);

impl MetadataSlot {
    /// Metadata published by the job, if it has succeeded.
    pub fn get(&self) -> Option<AttachmentMetadata> {
        self.0.get().cloned()
    }
}

/// Queue job that stores one attachment through a [`ChunkedWriter`].
///
/// Each attempt runs a full [`ChunkedWriter::process`], so a retry after a
/// storage failure writes a new object under a new id; chunks from the
/// failed attempt stay behind.
pub struct StoreAttachmentJob {
    id: JobId,
    writer: Arc<ChunkedWriter>,
    file_name: String,
    content_type: String,
    payload: Bytes,
    slot: MetadataSlot,
}

impl StoreAttachmentJob {
    pub fn new(
        writer: Arc<ChunkedWriter>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        payload: Bytes,
    ) -> Self {
        Self {
            id: JobId::random(),
            writer,
            file_name: file_name.into(),
            content_type: content_type.into(),
            payload,
            slot: MetadataSlot::default(),
        }
    }

    /// Handle for reading the result once the job is done.
    pub fn slot(&self) -> MetadataSlot {
        self.slot.clone()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

#[async_trait]
impl Job for StoreAttachmentJob {
    fn id(&self) -> &JobId {
        &self.id
    }

    async fn run(&self) -> Result<(), JobError> {
        let metadata = self
            .writer
            .process(&self.file_name, &self.content_type, self.payload.clone())
            .await
            .map_err(JobError::other)?;
        // A job only succeeds once, so the slot is empty here.
        let _ = self.slot.0.set(metadata);
        Ok(())
    }
}
