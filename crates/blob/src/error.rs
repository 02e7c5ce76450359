use thiserror::Error;

/// Errors that can occur while writing to an object store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key cannot be mapped onto the backend safely.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// An I/O error from a filesystem-backed store.
    #[error("storage I/O error for key {key}: {source}")]
    Io {
        /// Key being written.
        key: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Any other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}
