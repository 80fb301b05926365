use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode, header::CONTENT_TYPE};

use crate::dao::{blob::BlobStore, storage::StorageResult};

use super::{
    config::HttpStoreConfig,
    error::{HttpDaoError, HttpResult},
};

/// Object storage reached with plain `GET`/`PUT` requests on `<base_url>/<key>`.
#[derive(Clone)]
pub struct HttpBlobStore {
    client: Client,
    base_url: Arc<str>,
    token: Option<Arc<str>>,
}

impl HttpBlobStore {
    /// Build the client for the configured bucket.
    pub fn connect(config: HttpStoreConfig) -> HttpResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| HttpDaoError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            token: config.token.map(Arc::<str>::from),
        })
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }

    async fn get_object(&self, key: &str) -> HttpResult<Option<Vec<u8>>> {
        let url = self.object_url(key);
        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(|source| HttpDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .bytes()
                .await
                .map(|bytes| Some(bytes.to_vec()))
                .map_err(|source| HttpDaoError::ReadBody { path: url, source }),
            other => Err(HttpDaoError::RequestStatus {
                path: url,
                status: other,
            }),
        }
    }

    async fn put_object(&self, key: &str, bytes: Vec<u8>) -> HttpResult<()> {
        let url = self.object_url(key);
        let response = self
            .request(Method::PUT, &url)
            .header(CONTENT_TYPE, "application/json")
            .body(bytes)
            .send()
            .await
            .map_err(|source| HttpDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(HttpDaoError::RequestStatus {
                path: url,
                status: response.status(),
            })
        }
    }

    async fn head_check(&self) -> HttpResult<()> {
        let url = self.base_url.to_string();
        let response = self
            .request(Method::HEAD, &url)
            .send()
            .await
            .map_err(|source| HttpDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        // buckets commonly refuse listing; only server errors mean trouble
        if response.status().is_server_error() {
            Err(HttpDaoError::RequestStatus {
                path: url,
                status: response.status(),
            })
        } else {
            Ok(())
        }
    }
}

impl BlobStore for HttpBlobStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        let store = self.clone();
        let key = key.to_string();
        Box::pin(async move { store.get_object(&key).await.map_err(Into::into) })
    }

    fn put(&self, key: &str, bytes: Vec<u8>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let key = key.to_string();
        Box::pin(async move { store.put_object(&key, bytes).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.head_check().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_urls_join_cleanly() {
        let store =
            HttpBlobStore::connect(HttpStoreConfig::new("https://bucket.example/")).unwrap();
        assert_eq!(
            store.object_url("/reaction-results/reaction-time.json"),
            "https://bucket.example/reaction-results/reaction-time.json"
        );
    }
}
