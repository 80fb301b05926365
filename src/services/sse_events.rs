use serde::Serialize;
use tracing::warn;

use crate::{
    dao::models::StoredResult,
    dto::{
        format_epoch_ms,
        sse::{ResultSubmittedEvent, ServerEvent},
    },
    state::SharedState,
};

const EVENT_RESULT_SUBMITTED: &str = "result.submitted";

/// Broadcast a freshly stored result to public subscribers.
pub fn broadcast_result_submitted(state: &SharedState, test_type: &str, record: &StoredResult) {
    let payload = ResultSubmittedEvent {
        test_type: test_type.to_string(),
        submitted_at: format_epoch_ms(record.timestamp_ms),
        result: record.clone().into(),
    };
    send_public_event(state, EVENT_RESULT_SUBMITTED, &payload);
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}
