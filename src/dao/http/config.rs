use super::error::{HttpDaoError, HttpResult};

/// Runtime configuration describing how to reach the object storage bucket.
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl HttpStoreConfig {
    /// Construct a configuration from an explicit bucket base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
        }
    }

    /// Attach a bearer token sent with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> HttpResult<Self> {
        let base_url = std::env::var("STORE_BASE_URL").map_err(|_| HttpDaoError::MissingEnvVar {
            var: "STORE_BASE_URL",
        })?;

        let mut config = Self::new(base_url);
        if let Some(token) = std::env::var("STORE_TOKEN").ok().filter(|t| !t.is_empty()) {
            config = config.with_token(token);
        }

        Ok(config)
    }
}
