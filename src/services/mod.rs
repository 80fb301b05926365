/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Scopes, ranks and top lists.
pub mod ranking;
/// Result submission and leaderboard queries.
pub mod result_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Background storage health polling.
pub mod storage_supervisor;
