use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Name of the configured result storage backend.
    pub storage: String,
}

impl HealthResponse {
    /// The last storage health check succeeded.
    pub fn ok(storage: &str) -> Self {
        Self {
            status: "ok".to_string(),
            storage: storage.to_string(),
        }
    }

    /// The last storage health check failed; submissions are likely to fail.
    pub fn degraded(storage: &str) -> Self {
        Self {
            status: "degraded".to_string(),
            storage: storage.to_string(),
        }
    }
}
