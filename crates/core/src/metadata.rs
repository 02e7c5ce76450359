use serde::{Deserialize, Serialize};

use crate::types::ObjectId;

/// Identity and placement record for one stored attachment.
///
/// Produced once per processed part and handed to the caller; nothing in the
/// pipeline keeps a copy. The backend holding the chunk keys is the only
/// durable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    /// Random object identifier; also the key of an unchunked object.
    pub id: ObjectId,
    /// File name supplied by the sender.
    pub file_name: String,
    /// MIME content type supplied by the sender.
    pub content_type: String,
    /// Byte length of the original payload.
    pub size: u64,
    /// `SHA-256` hex digest of the whole payload (not of any chunk).
    pub checksum: String,
    /// Storage keys in payload order.
    pub chunks: Vec<String>,
}

impl AttachmentMetadata {
    /// Returns `true` if the payload was split across several keys.
    pub fn is_chunked(&self) -> bool {
        self.chunks.len() != 1 || self.chunks[0] != self.id.as_str()
    }
}
