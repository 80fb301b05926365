/// Object storage abstraction.
pub mod blob;
/// Filesystem-backed blob store.
pub mod fs;
/// HTTP object storage backend.
#[cfg(feature = "http")]
pub mod http;
/// In-memory blob store.
pub mod memory;
/// Persisted result definitions.
pub mod models;
/// Result blob read/write helpers.
pub mod results;
/// Storage error types.
pub mod storage;
