use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the reaction result service.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::results_stream,
        crate::routes::results::submit_default,
        crate::routes::results::leaderboard_default,
        crate::routes::results::submit,
        crate::routes::results::leaderboard,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::results::SubmitResultRequest,
            crate::dto::results::SubmitResultResponse,
            crate::dto::results::ResultEntry,
            crate::dto::results::RankSummary,
            crate::dto::results::ScopeBoard,
            crate::dto::results::ScopedBoards,
            crate::dto::results::LeaderboardResponse,
            crate::dto::sse::ResultSubmittedEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "results", description = "Reaction result submission and leaderboards"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
