use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::get,
};

use crate::{
    dto::results::{LeaderboardResponse, SubmitResultRequest, SubmitResultResponse},
    error::AppError,
    routes::geo::ClientLocation,
    services::result_service,
    state::SharedState,
};

/// Store a result under the default test type.
#[utoipa::path(
    post,
    path = "/reaction-result",
    tag = "results",
    request_body = SubmitResultRequest,
    responses(
        (status = 200, description = "Result stored", body = SubmitResultResponse),
        (status = 400, description = "Invalid submission"),
        (status = 500, description = "Result storage failed"),
    )
)]
pub async fn submit_default(
    State(state): State<SharedState>,
    ClientLocation(location): ClientLocation,
    payload: Result<Json<SubmitResultRequest>, JsonRejection>,
) -> Result<Json<SubmitResultResponse>, AppError> {
    let test_type = state.config().default_test_type.clone();
    let Json(payload) = payload.map_err(bad_json)?;
    Ok(Json(
        result_service::submit(&state, &test_type, payload, location).await?,
    ))
}

/// Leaderboards of the default test type around the caller.
#[utoipa::path(
    get,
    path = "/reaction-result",
    tag = "results",
    responses(
        (status = 200, description = "Scoped leaderboards", body = LeaderboardResponse),
        (status = 500, description = "Result storage failed"),
    )
)]
pub async fn leaderboard_default(
    State(state): State<SharedState>,
    ClientLocation(location): ClientLocation,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let test_type = state.config().default_test_type.clone();
    Ok(Json(
        result_service::leaderboard(&state, &test_type, location).await?,
    ))
}

/// Store a result for a named test type.
#[utoipa::path(
    post,
    path = "/results/{test_type}",
    tag = "results",
    params(("test_type" = String, Path, description = "Leaderboard name, e.g. `audio-reaction`")),
    request_body = SubmitResultRequest,
    responses(
        (status = 200, description = "Result stored", body = SubmitResultResponse),
        (status = 400, description = "Invalid submission or test type"),
        (status = 500, description = "Result storage failed"),
    )
)]
pub async fn submit(
    State(state): State<SharedState>,
    Path(test_type): Path<String>,
    ClientLocation(location): ClientLocation,
    payload: Result<Json<SubmitResultRequest>, JsonRejection>,
) -> Result<Json<SubmitResultResponse>, AppError> {
    let Json(payload) = payload.map_err(bad_json)?;
    Ok(Json(
        result_service::submit(&state, &test_type, payload, location).await?,
    ))
}

/// Leaderboards of a named test type around the caller.
#[utoipa::path(
    get,
    path = "/results/{test_type}",
    tag = "results",
    params(("test_type" = String, Path, description = "Leaderboard name, e.g. `audio-reaction`")),
    responses(
        (status = 200, description = "Scoped leaderboards", body = LeaderboardResponse),
        (status = 400, description = "Invalid test type"),
        (status = 500, description = "Result storage failed"),
    )
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    Path(test_type): Path<String>,
    ClientLocation(location): ClientLocation,
) -> Result<Json<LeaderboardResponse>, AppError> {
    Ok(Json(
        result_service::leaderboard(&state, &test_type, location).await?,
    ))
}

fn bad_json(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

/// Configure the result submission and leaderboard routes.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route(
            "/reaction-result",
            get(leaderboard_default).post(submit_default),
        )
        .route("/results/{test_type}", get(leaderboard).post(submit))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header::CONTENT_TYPE},
    };
    use futures::future::BoxFuture;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::{
        config::AppConfig,
        dao::{
            blob::BlobStore,
            memory::MemoryBlobStore,
            models::{ResultStore, StoredResult},
            storage::{StorageError, StorageResult},
        },
        routes,
        state::{AppState, ManualClock, SharedState},
    };

    const NOW: i64 = 1_760_000_000_000;

    fn state_with(blobs: Arc<dyn BlobStore>) -> SharedState {
        AppState::with_clock(
            AppConfig::default(),
            blobs,
            "memory",
            Arc::new(ManualClock::new(NOW)),
        )
    }

    fn stored(time: u32, country: &str, region: &str, city: &str) -> StoredResult {
        StoredResult {
            timestamp_ms: NOW - 1_000,
            reaction_time_ms: time,
            user_id: "anonymous".into(),
            country_code: country.into(),
            region: region.into(),
            city: city.into(),
        }
    }

    fn tokyo_request(method: &str, uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .header("x-vercel-ip-country", "JP")
            .header("x-vercel-ip-country-region", "13")
            .header("x-vercel-ip-city", "Tokyo")
            .body(body)
            .unwrap()
    }

    async fn call(state: SharedState, request: Request<Body>) -> (StatusCode, Value) {
        let response = routes::router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn post_ranks_against_the_callers_location() {
        let state = state_with(Arc::new(MemoryBlobStore::new()));
        let existing = vec![
            stored(150, "JP", "13", "Tokyo"),
            stored(170, "JP", "27", "Osaka"),
            stored(100, "FR", "IDF", "Paris"),
            stored(300, "JP", "13", "Tokyo"),
        ];
        state
            .results()
            .save("reaction-time", &ResultStore::new(existing))
            .await
            .unwrap();

        let body = Body::from(json!({ "reactionTimes": [180, 200, 220] }).to_string());
        let (status, json) = call(
            state,
            tokyo_request("POST", "/results/reaction-time", body),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Reaction time saved successfully");
        assert_eq!(json["result"]["reactionTime"], 200);
        assert_eq!(json["result"]["countryCode"], "JP");
        assert_eq!(json["result"]["city"], "Tokyo");

        let rankings = &json["rankings"];
        assert_eq!(rankings["regionalRank"], 2);
        assert_eq!(rankings["totalRegional"], 3);
        assert_eq!(rankings["nationalRank"], 3);
        assert_eq!(rankings["totalNational"], 4);
        assert_eq!(rankings["cityRank"], 2);
        assert_eq!(rankings["totalCity"], 3);
        assert_eq!(rankings["globalRank"], 4);
        assert_eq!(rankings["totalGlobal"], 5);
    }

    #[tokio::test]
    async fn get_returns_every_scope_board() {
        let state = state_with(Arc::new(MemoryBlobStore::new()));
        let existing = vec![
            stored(210, "JP", "13", "Tokyo"),
            stored(120, "US", "CA", "San Jose"),
        ];
        state
            .results()
            .save("reaction-time", &ResultStore::new(existing))
            .await
            .unwrap();

        let (status, json) = call(
            state,
            tokyo_request("GET", "/reaction-result", Body::empty()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let rankings = &json["rankings"];
        assert_eq!(rankings["regional"]["name"], "13, Japan");
        assert_eq!(rankings["national"]["name"], "Japan");
        assert_eq!(rankings["city"]["name"], "Tokyo");
        assert_eq!(rankings["global"]["name"], "Global");
        assert_eq!(rankings["regional"]["data"].as_array().unwrap().len(), 1);
        assert_eq!(rankings["global"]["data"][0]["reactionTime"], 120);
        assert_eq!(rankings["global"]["data"][1]["userId"], "anonymous");
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let state = state_with(Arc::new(MemoryBlobStore::new()));
        let (status, json) = call(
            state,
            tokyo_request("POST", "/reaction-result", Body::from("{\"reactionTime\": ")),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap().starts_with("bad request: "));
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn invalid_test_type_is_a_bad_request() {
        let state = state_with(Arc::new(MemoryBlobStore::new()));
        let body = Body::from(json!({ "reactionTime": 200 }).to_string());
        let (status, json) =
            call(state, tokyo_request("POST", "/results/Reaction_Time", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap().contains("Reaction_Time"));
    }

    struct UnreachableStore;

    impl BlobStore for UnreachableStore {
        fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
            let message = format!("failed to read `/srv/blobs/{key}`");
            Box::pin(async move {
                Err(StorageError::unavailable(
                    message,
                    std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
                ))
            })
        }

        fn put(&self, _key: &str, _bytes: Vec<u8>) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn storage_failure_is_a_sanitized_500() {
        let state = state_with(Arc::new(UnreachableStore));
        let body = Body::from(json!({ "reactionTime": 200 }).to_string());
        let (status, json) =
            call(state, tokyo_request("POST", "/reaction-result", body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "Error processing reaction result");
        assert_eq!(json["error"], "storage unavailable");
        assert!(!json.to_string().contains("/srv/blobs"));
    }
}
