use crate::error::AttachmentError;

const MIB: u64 = 1024 * 1024;

/// Decides whether a payload is stored whole or split into chunks.
///
/// Payloads of at most `threshold` bytes are written under a single key.
/// Larger payloads are cut into `chunk_size` slices, the last one possibly
/// shorter.
///
/// # Examples
///
/// ```
/// use inboxproxy_attachments::ChunkPolicy;
///
/// let policy = ChunkPolicy::default();
/// assert_eq!(policy.chunk_count(10), 1);
/// assert_eq!(policy.chunk_count(26 * 1024 * 1024), 6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    /// Largest payload stored under one key (inclusive).
    pub threshold: u64,
    /// Slice length used above the threshold.
    pub chunk_size: u64,
}

impl ChunkPolicy {
    /// Reference threshold: 25 MiB.
    pub const DEFAULT_THRESHOLD: u64 = 25 * MIB;
    /// Reference chunk size: 5 MiB.
    pub const DEFAULT_CHUNK_SIZE: u64 = 5 * MIB;

    /// Build a validated policy.
    pub fn new(threshold: u64, chunk_size: u64) -> Result<Self, AttachmentError> {
        let policy = Self {
            threshold,
            chunk_size,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), AttachmentError> {
        if self.chunk_size == 0 {
            return Err(AttachmentError::InvalidPolicy(
                "chunk_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Returns `true` if a payload of `size` bytes is stored as one object.
    pub fn is_single(&self, size: u64) -> bool {
        size <= self.threshold
    }

    /// Number of storage keys a payload of `size` bytes produces.
    pub fn chunk_count(&self, size: u64) -> usize {
        if self.is_single(size) {
            return 1;
        }
        usize::try_from(size.div_ceil(self.chunk_size)).unwrap_or(usize::MAX)
    }
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
        }
    }
}
