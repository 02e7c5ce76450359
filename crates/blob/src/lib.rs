pub mod error;
pub mod local;
pub mod memory;
pub mod store;

pub use error::StorageError;
pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;
pub use store::ObjectStore;
