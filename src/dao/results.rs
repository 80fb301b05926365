use std::sync::Arc;

use tracing::debug;

use crate::dao::{
    blob::BlobStore,
    models::ResultStore,
    storage::{StorageError, StorageResult},
};

/// Data Access Object reading and writing the per-test-type results blob.
#[derive(Clone)]
pub struct ResultRepository {
    blobs: Arc<dyn BlobStore>,
    prefix: Arc<str>,
}

impl ResultRepository {
    /// Repository over `blobs`, keeping one blob per test type under `prefix`.
    pub fn new(blobs: Arc<dyn BlobStore>, prefix: &str) -> Self {
        Self {
            blobs,
            prefix: Arc::from(prefix.trim_matches('/')),
        }
    }

    /// Blob key holding the results of `test_type`.
    pub fn key(&self, test_type: &str) -> String {
        format!("{}/{}.json", self.prefix, test_type)
    }

    /// Load every stored result of `test_type`; a missing blob is an empty store.
    pub async fn load(&self, test_type: &str) -> StorageResult<ResultStore> {
        let key = self.key(test_type);
        let Some(bytes) = self.blobs.get(&key).await? else {
            debug!(%key, "no results blob yet");
            return Ok(ResultStore::default());
        };

        serde_json::from_slice(&bytes).map_err(|source| StorageError::corrupt(key, source))
    }

    /// Replace the stored results of `test_type` wholesale.
    pub async fn save(&self, test_type: &str, store: &ResultStore) -> StorageResult<()> {
        let key = self.key(test_type);
        let bytes =
            serde_json::to_vec(store).map_err(|source| StorageError::corrupt(&key, source))?;
        self.blobs.put(&key, bytes).await
    }

    /// Health-check the underlying blob store.
    pub async fn health_check(&self) -> StorageResult<()> {
        self.blobs.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::{memory::MemoryBlobStore, models::StoredResult};

    #[tokio::test]
    async fn missing_blob_loads_empty() {
        let repo = ResultRepository::new(Arc::new(MemoryBlobStore::new()), "reaction-results");
        assert!(repo.load("reaction-time").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn saved_store_is_read_back() {
        let blobs = MemoryBlobStore::new();
        let repo = ResultRepository::new(Arc::new(blobs.clone()), "/reaction-results/");
        let store = ResultStore::new(vec![StoredResult {
            timestamp_ms: 1_700_000_000_000,
            reaction_time_ms: 187,
            user_id: "u1".into(),
            country_code: "DE".into(),
            region: "BE".into(),
            city: "Berlin".into(),
        }]);

        repo.save("reaction-time", &store).await.unwrap();
        assert_eq!(repo.load("reaction-time").await.unwrap(), store);
        assert!(
            blobs
                .get("reaction-results/reaction-time.json")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn garbage_blob_is_reported_as_corrupt() {
        let blobs = MemoryBlobStore::new();
        blobs
            .put("reaction-results/reaction-time.json", b"{not json".to_vec())
            .await
            .unwrap();
        let repo = ResultRepository::new(Arc::new(blobs), "reaction-results");
        let err = repo.load("reaction-time").await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }
}
