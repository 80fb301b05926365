use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::results::ResultEntry;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast whenever a new result has been stored.
pub struct ResultSubmittedEvent {
    /// Leaderboard the result was added to.
    pub test_type: String,
    /// RFC 3339 submission time.
    pub submitted_at: String,
    pub result: ResultEntry,
}
