// Profile, messaging, notifications, platform stats, and player search.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{auth::validate_username, clamp_limit, ActionResponse, AppState};
use crate::auth::AuthUser;
use crate::db::{LibraryEntry, Message, Notification, PlatformStats, PlayerSummary};
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::rate_limit::RateLimitType;

const MAX_BIO_CHARS: usize = 500;
const MAX_MESSAGE_CHARS: usize = 2000;
const NOTIFICATION_PAGE: i64 = 50;

// ── Profile ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub email_verified: bool,
    pub bio: String,
    pub created_at: String,
    pub games: Vec<LibraryEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub bio: Option<String>,
}

async fn load_profile(state: &AppState, user_id: i64) -> ApiResult<ProfileResponse> {
    let user = state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let games = state.db.list_user_games(user_id).await?;
    Ok(ProfileResponse {
        id: user.id,
        email_verified: user.is_email_verified(),
        email: user.email,
        username: user.username,
        bio: user.bio,
        created_at: user.created_at,
        games,
    })
}

pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    Ok(Json(load_profile(&state, auth.id()).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    if let Some(username) = &req.username {
        validate_username(username)?;
    }
    if let Some(bio) = &req.bio {
        if bio.chars().count() > MAX_BIO_CHARS {
            return Err(ApiError::bad_request("bio must be at most 500 characters"));
        }
    }

    state
        .db
        .update_user(auth.id(), req.username.as_deref().map(str::trim), req.bio.as_deref())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(load_profile(&state, auth.id()).await?))
}

// ── Messages ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub match_id: i64,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesParams {
    pub match_id: i64,
}

pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let user_id = auth.id();
    let content = req.content.trim();
    if content.is_empty() || content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::bad_request(
            "content must be between 1 and 2000 characters",
        ));
    }

    let record = state
        .db
        .get_accepted_match(req.match_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Match not found"))?;

    state
        .rate_limiter
        .check_limit(user_id, RateLimitType::MessagesSent)?;

    let message = state
        .db
        .create_message(record.id, user_id, record.partner_of(user_id), content)
        .await?;
    metrics::MESSAGES_SENT_TOTAL.inc();

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListMessagesParams>,
) -> ApiResult<Json<Vec<Message>>> {
    let record = state
        .db
        .get_accepted_match(params.match_id, auth.id())
        .await?
        .ok_or_else(|| ApiError::not_found("Match not found"))?;
    Ok(Json(state.db.list_messages(record.id).await?))
}

// ── Notifications ────────────────────────────────────────────────────

pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(
        state
            .db
            .list_notifications(auth.id(), NOTIFICATION_PAGE)
            .await?,
    ))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<ActionResponse>> {
    if !state.db.mark_notification_read(id, auth.id()).await? {
        return Err(ApiError::not_found("Notification not found"));
    }
    Ok(Json(ActionResponse::ok("Notification marked as read")))
}

// ── Stats & search ───────────────────────────────────────────────────

pub async fn platform_stats(State(state): State<AppState>) -> ApiResult<Json<PlatformStats>> {
    Ok(Json(state.db.platform_stats().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchPlayersParams {
    pub q: Option<String>,
    pub game_id: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn search_players(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<SearchPlayersParams>,
) -> ApiResult<Json<Vec<PlayerSummary>>> {
    let players = state
        .db
        .search_players(
            auth.id(),
            params.q.as_deref(),
            params.game_id,
            clamp_limit(params.limit, 20, 100),
        )
        .await?;
    Ok(Json(players))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{auth_as, create_user, test_state};
    use crate::db::{MatchStatus, SkillLevel};

    async fn accepted_pair(state: &AppState) -> (i64, i64, i64) {
        let alice = create_user(state, "alice").await;
        let bob = create_user(state, "bob").await;
        let id = state
            .db
            .create_match_record(alice.id, bob.id, 90)
            .await
            .unwrap()
            .unwrap();
        state
            .db
            .decide_match(id, bob.id, MatchStatus::Accepted)
            .await
            .unwrap();
        (alice.id, bob.id, id)
    }

    #[tokio::test]
    async fn test_profile_roundtrip() {
        let state = test_state().await;
        let user = create_user(&state, "gamer").await;
        let game = state.db.create_game("Minecraft", "Sandbox", None).await.unwrap();
        state
            .db
            .add_user_game(user.id, game.id, SkillLevel::Intermediate, 12)
            .await
            .unwrap();

        let Json(profile) = get_profile(State(state.clone()), auth_as(user.id))
            .await
            .unwrap();
        assert_eq!(profile.username, "gamer");
        assert!(!profile.email_verified);
        assert_eq!(profile.games.len(), 1);

        let Json(updated) = update_profile(
            State(state.clone()),
            auth_as(user.id),
            Json(UpdateProfileRequest {
                username: None,
                bio: Some("builder".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.username, "gamer");
        assert_eq!(updated.bio, "builder");

        let err = update_profile(
            State(state),
            auth_as(user.id),
            Json(UpdateProfileRequest {
                username: Some("x".to_string()),
                bio: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_profile_of_deleted_user() {
        let state = test_state().await;
        let err = get_profile(State(state), auth_as(404)).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_messages_between_matched_players() {
        let state = test_state().await;
        let (alice, bob, match_id) = accepted_pair(&state).await;

        let (status, Json(sent)) = send_message(
            State(state.clone()),
            auth_as(alice),
            Json(SendMessageRequest {
                match_id,
                content: "  duo tonight?  ".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(sent.content, "duo tonight?");

        let Json(thread) = list_messages(
            State(state.clone()),
            auth_as(bob),
            Query(ListMessagesParams { match_id }),
        )
        .await
        .unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].sender_id, alice);

        let Json(notes) = list_notifications(State(state.clone()), auth_as(bob))
            .await
            .unwrap();
        assert_eq!(notes[0].kind, "new_message");

        let Json(ack) = mark_notification_read(State(state.clone()), auth_as(bob), Path(notes[0].id))
            .await
            .unwrap();
        assert!(ack.success);

        let not_mine = mark_notification_read(State(state), auth_as(alice), Path(notes[0].id))
            .await
            .unwrap_err();
        assert!(matches!(not_mine, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_messages_require_accepted_match() {
        let state = test_state().await;
        let alice = create_user(&state, "alice").await;
        let bob = create_user(&state, "bob").await;
        let pending = state
            .db
            .create_match_record(alice.id, bob.id, 50)
            .await
            .unwrap()
            .unwrap();

        let err = send_message(
            State(state.clone()),
            auth_as(alice.id),
            Json(SendMessageRequest {
                match_id: pending,
                content: "hi".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let empty = send_message(
            State(state),
            auth_as(alice.id),
            Json(SendMessageRequest {
                match_id: pending,
                content: "   ".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(empty, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_platform_stats() {
        let state = test_state().await;
        accepted_pair(&state).await;

        let Json(stats) = platform_stats(State(state)).await.unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_matches, 1);
        assert_eq!(stats.accepted_matches, 1);
        assert_eq!(stats.total_messages, 0);
    }

    #[tokio::test]
    async fn test_search_players_excludes_caller() {
        let state = test_state().await;
        let (alice, _, _) = accepted_pair(&state).await;

        let Json(players) = search_players(
            State(state),
            auth_as(alice),
            Query(SearchPlayersParams::default()),
        )
        .await
        .unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].username, "bob");
    }
}
