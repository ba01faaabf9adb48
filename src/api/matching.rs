// Match discovery and accept / reject handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ActionResponse, AppState};
use crate::auth::AuthUser;
use crate::db::{MatchStatus, MatchSummary};
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::rate_limit::RateLimitType;
use crate::scoring::Candidate;

/// Shown when the scorer finds nobody, usually because the library is empty.
pub const NO_CANDIDATES_HINT: &str = "Ajoute des jeux à ton profil pour trouver des matchs";

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct FindMatchesParams {
    pub limit: Option<usize>,
}

/// A scored candidate together with the match record created for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub match_id: i64,
    #[serde(flatten)]
    pub candidate: Candidate,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FindMatchesResponse {
    pub matches: Vec<MatchCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub async fn find_matches(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<FindMatchesParams>,
) -> ApiResult<Json<FindMatchesResponse>> {
    let user_id = auth.id();
    state
        .rate_limiter
        .check_limit(user_id, RateLimitType::MatchSearches)?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let candidates = state.scorer.find_candidates(user_id, limit).await?;
    let pairs: Vec<(i64, i64)> = candidates
        .iter()
        .map(|c| (c.user_id, c.match_score))
        .collect();
    let recorded = state.db.record_matches(user_id, &pairs).await?;

    let created = recorded.iter().filter(|r| r.created).count();
    metrics::MATCHES_CREATED_TOTAL.inc_by(created as u64);

    // Candidates whose pair was skipped (finalized or self) drop out here
    let matches: Vec<MatchCandidate> = candidates
        .into_iter()
        .filter_map(|candidate| {
            recorded
                .iter()
                .find(|r| r.partner_id == candidate.user_id)
                .map(|r| MatchCandidate {
                    match_id: r.match_id,
                    candidate,
                })
        })
        .collect();

    if matches.is_empty() {
        return Ok(Json(FindMatchesResponse {
            matches,
            message: Some(NO_CANDIDATES_HINT.to_string()),
        }));
    }

    info!(user_id, found = matches.len(), created, "Match candidates recorded");
    Ok(Json(FindMatchesResponse {
        matches,
        message: None,
    }))
}

async fn decide(
    state: &AppState,
    match_id: i64,
    user_id: i64,
    status: MatchStatus,
) -> ApiResult<()> {
    let affected = state.db.decide_match(match_id, user_id, status).await?;
    if affected == 0 {
        return Err(ApiError::not_found("Match not found"));
    }
    metrics::MATCH_DECISIONS_TOTAL
        .with_label_values(&[status.as_str()])
        .inc();
    info!(match_id, user_id, status = status.as_str(), "Match decided");
    Ok(())
}

pub async fn accept_match(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(match_id): Path<i64>,
) -> ApiResult<Json<ActionResponse>> {
    decide(&state, match_id, auth.id(), MatchStatus::Accepted).await?;
    Ok(Json(ActionResponse::ok("Match accepted")))
}

pub async fn reject_match(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(match_id): Path<i64>,
) -> ApiResult<Json<ActionResponse>> {
    decide(&state, match_id, auth.id(), MatchStatus::Rejected).await?;
    Ok(Json(ActionResponse::ok("Match rejected")))
}

pub async fn list_matches(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<MatchSummary>>> {
    Ok(Json(state.db.list_matches_for_user(auth.id()).await?))
}
