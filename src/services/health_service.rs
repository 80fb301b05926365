use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Check the result storage and report the resulting health.
///
/// A failed check flips the shared degraded flag right away instead of
/// waiting for the next supervisor tick.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.results().health_check().await {
        Ok(()) => state.update_degraded(false),
        Err(err) => {
            warn!(error = %err, backend = state.storage_backend(), "storage health check failed");
            state.update_degraded(true);
        }
    }

    if state.is_degraded() {
        HealthResponse::degraded(state.storage_backend())
    } else {
        HealthResponse::ok(state.storage_backend())
    }
}
