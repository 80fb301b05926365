//! Error types for the HTTP object storage backend.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Convenient result alias returning [`HttpDaoError`] failures.
pub type HttpResult<T> = Result<T, HttpDaoError>;

/// Failures that can occur while talking to the object storage endpoint.
#[derive(Debug, Error)]
pub enum HttpDaoError {
    /// Required environment variable is missing.
    #[error("missing object storage environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build object storage client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// A request to an object could not be sent.
    #[error("failed to send object storage request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The bucket returned an unexpected status code.
    #[error("unexpected object storage response status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// Reading the response body failed.
    #[error("failed to read object storage response for `{path}`")]
    ReadBody {
        path: String,
        #[source]
        source: reqwest::Error,
    },
}

impl From<HttpDaoError> for StorageError {
    fn from(err: HttpDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
