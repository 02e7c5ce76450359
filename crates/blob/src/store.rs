use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageError;

/// Write capability the attachment pipeline depends on.
///
/// Keys are opaque path-safe tokens. Saving to an existing key replaces the
/// previous object. Implementations must be `Send + Sync` to be shared across
/// worker tasks.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist `data` under `key`.
    async fn save(&self, key: &str, data: Bytes) -> Result<(), StorageError>;
}
