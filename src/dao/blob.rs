use futures::future::BoxFuture;

use crate::dao::storage::StorageResult;

/// Opaque key/value object storage holding whole serialized blobs.
pub trait BlobStore: Send + Sync {
    /// Fetch the blob stored under `key`, if any.
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>>;
    /// Store `bytes` under `key`, replacing any previous blob.
    fn put(&self, key: &str, bytes: Vec<u8>) -> BoxFuture<'static, StorageResult<()>>;
    /// Check that the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
