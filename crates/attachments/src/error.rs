use thiserror::Error;

use inboxproxy_blob::StorageError;
use inboxproxy_executor::QueueError;

/// Errors from [`ChunkedWriter`](crate::ChunkedWriter).
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// A save failed. Chunks written before it remain on the backend.
    #[error("failed to store {key} after {written} chunk(s) were written: {source}")]
    Storage {
        /// Key whose save failed.
        key: String,
        /// Chunks successfully saved before the failure.
        written: usize,
        #[source]
        source: StorageError,
    },

    #[error("invalid chunk policy: {0}")]
    InvalidPolicy(String),
}

/// Errors from [`Ingestor::ingest`](crate::Ingestor::ingest).
#[derive(Debug, Error)]
pub enum IngestError {
    /// The input is not a parseable multipart message. Never retried.
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The job storing this attachment ended in the failed state.
    #[error("attachment {file_name:?} could not be stored: {message}")]
    Attachment { file_name: String, message: String },

    /// The job reported success without publishing metadata.
    #[error("no metadata produced for attachment {file_name:?}")]
    MissingResult { file_name: String },
}
