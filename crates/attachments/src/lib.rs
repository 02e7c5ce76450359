pub mod error;
pub mod ingest;
pub mod job;
pub mod policy;
pub mod writer;

pub use error::{AttachmentError, IngestError};
pub use ingest::{AttachmentPart, Ingestor, extract_parts};
pub use job::{MetadataSlot, StoreAttachmentJob};
pub use policy::ChunkPolicy;
pub use writer::ChunkedWriter;
