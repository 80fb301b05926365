//! Result submission and leaderboard queries over the per-test-type store.
//!
//! Every call rereads the whole blob. Submissions prune, append and rewrite
//! it; queries prune in memory only, so stale entries leave the blob on the
//! next write.

use tracing::{debug, info};
use validator::Validate;

use crate::{
    dao::models::{ANONYMOUS_USER, ResultStore, StoredResult},
    dto::{
        results::{
            LeaderboardResponse, RankSummary, ScopeBoard, ScopedBoards, SubmitResultRequest,
            SubmitResultResponse,
        },
        validation::validate_test_type,
    },
    error::ServiceError,
    services::{
        ranking::{self, Location, Scope},
        sse_events,
    },
    state::SharedState,
};

/// Store one completed session and report its rank in every scope.
pub async fn submit(
    state: &SharedState,
    test_type: &str,
    request: SubmitResultRequest,
    location: Location,
) -> Result<SubmitResultResponse, ServiceError> {
    ensure_test_type(test_type)?;
    request.validate()?;

    let reaction_time_ms = request.representative_ms().ok_or_else(|| {
        ServiceError::InvalidInput("submission carries no reaction time".into())
    })?;
    let user_id = request
        .user_id
        .map(|id| id.trim().to_string())
        .unwrap_or_else(|| ANONYMOUS_USER.to_string());

    let (record, store) = {
        let _gate = state.lock_results(test_type).await;
        let now_ms = state.now_ms();

        let mut store = state.results().load(test_type).await?;
        let pruned = prune(state, &mut store, now_ms);

        let record = StoredResult {
            timestamp_ms: now_ms,
            reaction_time_ms,
            user_id,
            country_code: location.country_code.clone(),
            region: location.region.clone(),
            city: location.city.clone(),
        };
        store.push(record.clone());
        state.results().save(test_type, &store).await?;

        debug!(test_type, pruned, "rewrote result store");
        (record, store)
    };

    let rankings = rank_summary(&store, &location, reaction_time_ms);
    info!(
        test_type,
        reaction_time_ms,
        country = %location.country_code,
        global_rank = rankings.global_rank,
        total = rankings.total_global,
        "stored reaction result"
    );
    sse_events::broadcast_result_submitted(state, test_type, &record);

    Ok(SubmitResultResponse {
        message: "Reaction time saved successfully".into(),
        result: record.into(),
        rankings,
    })
}

/// Top entries of every scope around `location`.
pub async fn leaderboard(
    state: &SharedState,
    test_type: &str,
    location: Location,
) -> Result<LeaderboardResponse, ServiceError> {
    ensure_test_type(test_type)?;

    let mut store = state.results().load(test_type).await?;
    prune(state, &mut store, state.now_ms());

    let limit = state.config().leaderboard_size;
    let board = |scope: Scope| ScopeBoard {
        name: scope.label(&location),
        data: ranking::top(&store.entries, scope, &location, limit)
            .into_iter()
            .map(Into::into)
            .collect(),
    };

    Ok(LeaderboardResponse {
        rankings: ScopedBoards {
            regional: board(Scope::Regional),
            national: board(Scope::National),
            city: board(Scope::City),
            global: board(Scope::Global),
        },
    })
}

fn ensure_test_type(test_type: &str) -> Result<(), ServiceError> {
    validate_test_type(test_type).map_err(|err| {
        let reason = err
            .message
            .map(|message| message.to_string())
            .unwrap_or_else(|| err.code.to_string());
        ServiceError::InvalidInput(format!("invalid test type `{test_type}`: {reason}"))
    })
}

/// Drop entries that fell out of the retention window.
fn prune(state: &SharedState, store: &mut ResultStore, now_ms: i64) -> usize {
    let cutoff = now_ms.saturating_sub(state.config().retention_ms());
    store.prune_before(cutoff)
}

fn rank_summary(store: &ResultStore, location: &Location, value: u32) -> RankSummary {
    let at = |scope| ranking::standing(&store.entries, scope, location, value);
    let (regional, national, city, global) = (
        at(Scope::Regional),
        at(Scope::National),
        at(Scope::City),
        at(Scope::Global),
    );

    RankSummary {
        regional_rank: regional.rank,
        total_regional: regional.total,
        national_rank: national.rank,
        total_national: national.total,
        global_rank: global.rank,
        total_global: global.total,
        city_rank: city.rank,
        total_city: city.total,
    }
}
