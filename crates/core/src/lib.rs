pub mod digest;
pub mod metadata;
pub mod types;

pub use digest::{random_token, sha256_hex};
pub use metadata::AttachmentMetadata;
pub use types::{JobId, ObjectId};
