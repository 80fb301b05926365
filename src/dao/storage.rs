use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by blob backends and the result repository.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or refused the operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A blob exists but does not hold a result list.
    #[error("stored blob `{key}` is not valid JSON")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Wrap any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Short description of the failure class, free of paths and URLs.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageError::Unavailable { .. } => "storage unavailable",
            StorageError::Corrupt { .. } => "corrupt result blob",
        }
    }

    /// The blob under `key` failed to (de)serialize.
    pub fn corrupt(key: impl Into<String>, source: serde_json::Error) -> Self {
        StorageError::Corrupt {
            key: key.into(),
            source,
        }
    }
}
