use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{dao::models::StoredResult, reaction::session::average_ms};

/// Longest accepted user identifier.
const MAX_USER_ID_LEN: usize = 64;
/// Smallest average that still rounds to a positive millisecond count.
const MIN_AVERAGE_MS: f64 = 0.5;

/// Body of a result submission.
///
/// Either a single `reactionTime` or the full list of `reactionTimes` (with an
/// optional precomputed `averageTime`) must be provided.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResultRequest {
    /// Single measured latency in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction_time: Option<u32>,
    /// Every measured latency of the session, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction_times: Option<Vec<u32>>,
    /// Average computed by the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_time: Option<f64>,
    /// Optional user identifier; anonymous when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl SubmitResultRequest {
    /// Latency recorded for the session: the supplied average, else the mean
    /// of the attempts, else the single reaction time.
    pub fn representative_ms(&self) -> Option<u32> {
        if let Some(average) = self
            .average_time
            .filter(|avg| avg.is_finite() && *avg >= MIN_AVERAGE_MS)
        {
            return Some((average + 0.5).floor().min(f64::from(u32::MAX)) as u32);
        }
        if let Some(times) = self.reaction_times.as_deref() {
            return average_ms(times);
        }
        self.reaction_time
    }
}

fn error(code: &'static str, message: &str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.to_string().into());
    err
}

impl Validate for SubmitResultRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.reaction_time.is_none() && self.reaction_times.is_none() {
            errors.add(
                "reactionTime",
                error("missing", "either reactionTime or reactionTimes is required"),
            );
        }

        if self.reaction_time == Some(0) {
            errors.add("reactionTime", error("positive", "reactionTime must be positive"));
        }

        if let Some(times) = &self.reaction_times {
            if times.is_empty() {
                errors.add(
                    "reactionTimes",
                    error("non_empty", "reactionTimes must not be empty"),
                );
            } else if times.contains(&0) {
                errors.add(
                    "reactionTimes",
                    error("positive", "every reaction time must be positive"),
                );
            }
        }

        if let Some(average) = self.average_time {
            if !average.is_finite() || average < MIN_AVERAGE_MS {
                errors.add(
                    "averageTime",
                    error("positive", "averageTime must round to at least 1 ms"),
                );
            }
        }

        if let Some(user_id) = &self.user_id {
            if user_id.trim().is_empty() || user_id.chars().count() > MAX_USER_ID_LEN {
                errors.add(
                    "userId",
                    error("length", "userId must be between 1 and 64 characters"),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Public projection of a stored result.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    /// Submission time, milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Representative latency in milliseconds.
    pub reaction_time: u32,
    pub user_id: String,
    pub country_code: String,
    pub region: String,
    pub city: String,
}

impl From<StoredResult> for ResultEntry {
    fn from(result: StoredResult) -> Self {
        Self {
            timestamp: result.timestamp_ms,
            reaction_time: result.reaction_time_ms,
            user_id: result.user_id,
            country_code: result.country_code,
            region: result.region,
            city: result.city,
        }
    }
}

/// Rank of a submission in each scope, with the scope sizes.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RankSummary {
    pub regional_rank: usize,
    pub total_regional: usize,
    pub national_rank: usize,
    pub total_national: usize,
    pub global_rank: usize,
    pub total_global: usize,
    pub city_rank: usize,
    pub total_city: usize,
}

/// Returned once a submission has been stored.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmitResultResponse {
    pub message: String,
    pub result: ResultEntry,
    pub rankings: RankSummary,
}

/// Top entries of one scope.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScopeBoard {
    /// Human readable scope label.
    pub name: String,
    /// Fastest entries, ascending.
    pub data: Vec<ResultEntry>,
}

/// Boards for every scope around the caller.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScopedBoards {
    pub regional: ScopeBoard,
    pub national: ScopeBoard,
    pub city: ScopeBoard,
    pub global: ScopeBoard,
}

/// Leaderboard snapshot.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub rankings: ScopedBoards,
}
