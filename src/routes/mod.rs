use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod geo;
pub mod health;
pub mod results;
pub mod sse;

/// Compose every route tree and bind the shared state.
pub fn router(state: SharedState) -> Router<()> {
    Router::new()
        .merge(health::router())
        .merge(results::router())
        .merge(sse::router())
        .merge(docs::router())
        .with_state(state)
}
