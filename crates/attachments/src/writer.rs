use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, instrument};

use inboxproxy_blob::ObjectStore;
use inboxproxy_core::{AttachmentMetadata, ObjectId, sha256_hex};

use crate::error::AttachmentError;
use crate::policy::ChunkPolicy;

/// Stores named payloads through an [`ObjectStore`], splitting large ones
/// into chunks.
///
/// Every call to [`process`](Self::process) creates a new object with a
/// fresh random id, so storing the same bytes twice yields two independent
/// objects. Writes for one object are issued sequentially in chunk order.
pub struct ChunkedWriter {
    store: Arc<dyn ObjectStore>,
    policy: ChunkPolicy,
}

impl ChunkedWriter {
    pub fn new(store: Arc<dyn ObjectStore>, policy: ChunkPolicy) -> Result<Self, AttachmentError> {
        policy.validate()?;
        Ok(Self { store, policy })
    }

    pub fn policy(&self) -> &ChunkPolicy {
        &self.policy
    }

    /// Checksum `payload`, write it under one or more keys and describe the
    /// result.
    ///
    /// The checksum covers the whole payload and is computed before any
    /// write. A failed save aborts immediately with
    /// [`AttachmentError::Storage`]; chunks saved before it are left in place.
    #[instrument(skip(self, payload), fields(size = payload.len(), object_id = tracing::field::Empty))]
    pub async fn process(
        &self,
        file_name: &str,
        content_type: &str,
        payload: Bytes,
    ) -> Result<AttachmentMetadata, AttachmentError> {
        let id = ObjectId::random();
        tracing::Span::current().record("object_id", id.as_str());

        let size = payload.len() as u64;
        let checksum = sha256_hex(&payload);
        let mut chunks = Vec::new();

        if self.policy.is_single(size) {
            self.save(id.as_str(), payload, 0).await?;
            chunks.push(id.to_string());
        } else {
            let step = usize::try_from(self.policy.chunk_size).unwrap_or(usize::MAX);
            for (index, start) in (0..payload.len()).step_by(step).enumerate() {
                let end = start.saturating_add(step).min(payload.len());
                let key = id.chunk_key(index);
                self.save(&key, payload.slice(start..end), chunks.len())
                    .await?;
                chunks.push(key);
            }
        }

        debug!(chunks = chunks.len(), %checksum, "attachment stored");

        Ok(AttachmentMetadata {
            id,
            file_name: file_name.to_owned(),
            content_type: content_type.to_owned(),
            size,
            checksum,
            chunks,
        })
    }

    async fn save(&self, key: &str, data: Bytes, written: usize) -> Result<(), AttachmentError> {
        self.store
            .save(key, data)
            .await
            .map_err(|source| AttachmentError::Storage {
                key: key.to_owned(),
                written,
                source,
            })
    }
}
