use std::time::{Duration, SystemTime, UNIX_EPOCH};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod health;
pub mod results;
pub mod sse;
pub mod validation;

/// Format milliseconds since the Unix epoch as RFC 3339.
pub fn format_epoch_ms(timestamp_ms: i64) -> String {
    let time = UNIX_EPOCH + Duration::from_millis(timestamp_ms.max(0) as u64);
    format_system_time(time)
}

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
