use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use tokio::fs;

use crate::dao::{
    blob::BlobStore,
    storage::{StorageError, StorageResult},
};

/// Blob store keeping one file per key below a root directory.
#[derive(Clone)]
pub struct FsBlobStore {
    root: Arc<Path>,
}

impl FsBlobStore {
    /// Store blobs under `root`, which is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        Self {
            root: Arc::from(root),
        }
    }

    /// Map a key onto a path, refusing anything that would escape the root.
    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(StorageError::unavailable(
                format!("invalid blob key `{key}`"),
                std::io::Error::from(ErrorKind::InvalidInput),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for FsBlobStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        let path = self.path_for(key);
        Box::pin(async move {
            let path = path?;
            match fs::read(&path).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(err) => Err(StorageError::unavailable(
                    format!("failed to read `{}`", path.display()),
                    err,
                )),
            }
        })
    }

    fn put(&self, key: &str, bytes: Vec<u8>) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path_for(key);
        Box::pin(async move {
            let path = path?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await.map_err(|err| {
                    StorageError::unavailable(
                        format!("failed to create `{}`", parent.display()),
                        err,
                    )
                })?;
            }

            // readers only ever see complete blobs
            let staging = path.with_extension("tmp");
            fs::write(&staging, &bytes).await.map_err(|err| {
                StorageError::unavailable(format!("failed to write `{}`", staging.display()), err)
            })?;
            fs::rename(&staging, &path).await.map_err(|err| {
                StorageError::unavailable(format!("failed to replace `{}`", path.display()), err)
            })
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let root = self.root.clone();
        Box::pin(async move {
            match fs::metadata(&root).await {
                Ok(meta) if meta.is_dir() => Ok(()),
                Ok(_) => Err(StorageError::unavailable(
                    format!("`{}` is not a directory", root.display()),
                    std::io::Error::from(ErrorKind::NotADirectory),
                )),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    fs::create_dir_all(&root).await.map_err(|err| {
                        StorageError::unavailable(
                            format!("failed to create `{}`", root.display()),
                            err,
                        )
                    })
                }
                Err(err) => Err(StorageError::unavailable(
                    format!("failed to stat `{}`", root.display()),
                    err,
                )),
            }
        })
    }
}
