// Game catalogue and per-user game library handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::{ActionResponse, AppState};
use crate::auth::AuthUser;
use crate::db::{Game, LibraryEntry, SkillLevel};
use crate::error::{is_unique_violation, ApiError, ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct SearchGamesParams {
    pub q: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddUserGameRequest {
    pub game_id: i64,
    #[serde(default)]
    pub skill_level: Option<SkillLevel>,
    #[serde(default)]
    pub hours_played: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserGameRequest {
    #[serde(default)]
    pub skill_level: Option<SkillLevel>,
    #[serde(default)]
    pub hours_played: Option<i64>,
}

fn validate_hours(hours_played: Option<i64>) -> ApiResult<()> {
    match hours_played {
        Some(h) if h < 0 => Err(ApiError::bad_request("hours_played must not be negative")),
        _ => Ok(()),
    }
}

pub async fn get_all_games(State(state): State<AppState>) -> ApiResult<Json<Vec<Game>>> {
    Ok(Json(state.db.list_games().await?))
}

pub async fn search_games(
    State(state): State<AppState>,
    Query(params): Query<SearchGamesParams>,
) -> ApiResult<Json<Vec<Game>>> {
    let games = state
        .db
        .search_games(params.q.as_deref(), params.category.as_deref())
        .await?;
    Ok(Json(games))
}

pub async fn list_user_games(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<LibraryEntry>>> {
    Ok(Json(state.db.list_user_games(auth.id()).await?))
}

pub async fn add_user_game(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<AddUserGameRequest>,
) -> ApiResult<(StatusCode, Json<ActionResponse>)> {
    validate_hours(req.hours_played)?;
    let user_id = auth.id();

    let game = state
        .db
        .get_game(req.game_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Game not found"))?;

    if state.db.get_user_game(user_id, game.id).await?.is_some() {
        return Err(ApiError::conflict("Game already in your profile"));
    }

    let inserted = state
        .db
        .add_user_game(
            user_id,
            game.id,
            req.skill_level.unwrap_or_default(),
            req.hours_played.unwrap_or(0),
        )
        .await;
    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::conflict("Game already in your profile"));
        }
        Err(e) => return Err(e.into()),
    }

    info!(user_id, game_id = game.id, "Game added to library");
    Ok((
        StatusCode::CREATED,
        Json(ActionResponse::ok(format!(
            "{} added to your profile",
            game.name
        ))),
    ))
}

pub async fn update_user_game(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(game_id): Path<i64>,
    Json(req): Json<UpdateUserGameRequest>,
) -> ApiResult<Json<ActionResponse>> {
    validate_hours(req.hours_played)?;
    let user_id = auth.id();

    if state.db.get_user_game(user_id, game_id).await?.is_none() {
        return Err(ApiError::not_found("Game not in your profile"));
    }

    let updated = state
        .db
        .update_user_game(user_id, game_id, req.skill_level, req.hours_played)
        .await?;
    if !updated {
        return Err(ApiError::not_found("Game not in your profile"));
    }

    Ok(Json(ActionResponse::ok("Game updated successfully")))
}

pub async fn remove_user_game(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(game_id): Path<i64>,
) -> ApiResult<Json<ActionResponse>> {
    let user_id = auth.id();

    let entry = state
        .db
        .get_user_game(user_id, game_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Game not in your profile"))?;

    state.db.remove_user_game(user_id, game_id).await?;

    info!(user_id, game_id, "Game removed from library");
    Ok(Json(ActionResponse::ok(format!(
        "{} removed from your profile",
        entry.name
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{auth_as, create_user, test_state};

    fn add_request(game_id: i64) -> AddUserGameRequest {
        AddUserGameRequest {
            game_id,
            skill_level: None,
            hours_played: None,
        }
    }

    #[tokio::test]
    async fn test_get_all_games() {
        let state = test_state().await;
        assert!(get_all_games(State(state.clone())).await.unwrap().0.is_empty());

        let a = state.db.create_game("Game A", "FPS", None).await.unwrap();
        let b = state
            .db
            .create_game("Game B", "RPG", Some("http://icon"))
            .await
            .unwrap();

        let Json(games) = get_all_games(State(state)).await.unwrap();
        assert_eq!(games, vec![a, b]);
    }

    #[tokio::test]
    async fn test_search_games() {
        let state = test_state().await;
        let game = state.db.create_game("Game", "Action", None).await.unwrap();
        state.db.create_game("Game Two", "RPG", None).await.unwrap();

        let Json(found) = search_games(
            State(state.clone()),
            Query(SearchGamesParams {
                q: Some("Game".to_string()),
                category: Some("Action".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(found, vec![game]);

        let Json(unfiltered) = search_games(State(state.clone()), Query(SearchGamesParams::default()))
            .await
            .unwrap();
        let Json(all) = get_all_games(State(state)).await.unwrap();
        assert_eq!(unfiltered, all);
    }

    #[tokio::test]
    async fn test_add_user_game_not_found() {
        let state = test_state().await;
        let user = create_user(&state, "player").await;

        let err = add_user_game(State(state), auth_as(user.id), Json(add_request(99)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_add_user_game_success_then_duplicate() {
        let state = test_state().await;
        let user = create_user(&state, "player").await;
        let game = state.db.create_game("Valorant", "FPS", None).await.unwrap();

        let (status, Json(body)) = add_user_game(
            State(state.clone()),
            auth_as(user.id),
            Json(AddUserGameRequest {
                game_id: game.id,
                skill_level: Some(SkillLevel::Advanced),
                hours_played: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(body.success);
        assert!(body.message.contains("added to your profile"));

        let err = add_user_game(State(state.clone()), auth_as(user.id), Json(add_request(game.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let Json(library) = list_user_games(State(state), auth_as(user.id)).await.unwrap();
        assert_eq!(library.len(), 1);
        assert_eq!(library[0].skill_level, "advanced");
    }

    #[tokio::test]
    async fn test_add_user_game_rejects_negative_hours() {
        let state = test_state().await;
        let err = add_user_game(
            State(state),
            auth_as(1),
            Json(AddUserGameRequest {
                game_id: 1,
                skill_level: None,
                hours_played: Some(-5),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_update_user_game_missing() {
        let state = test_state().await;
        let user = create_user(&state, "player").await;

        let err = update_user_game(
            State(state),
            auth_as(user.id),
            Path(5),
            Json(UpdateUserGameRequest::default()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_user_game_success() {
        let state = test_state().await;
        let user = create_user(&state, "player").await;
        let game = state.db.create_game("Valorant", "FPS", None).await.unwrap();
        state
            .db
            .add_user_game(user.id, game.id, SkillLevel::Beginner, 0)
            .await
            .unwrap();

        let Json(body) = update_user_game(
            State(state.clone()),
            auth_as(user.id),
            Path(game.id),
            Json(UpdateUserGameRequest {
                skill_level: None,
                hours_played: Some(100),
            }),
        )
        .await
        .unwrap();
        assert_eq!(body, ActionResponse::ok("Game updated successfully"));

        let entry = state.db.get_user_game(user.id, game.id).await.unwrap().unwrap();
        assert_eq!(entry.hours_played, 100);
        assert_eq!(entry.skill_level, "beginner");
    }

    #[tokio::test]
    async fn test_remove_user_game() {
        let state = test_state().await;
        let user = create_user(&state, "player").await;
        let game = state
            .db
            .create_game("Apex Legends", "Battle Royale", None)
            .await
            .unwrap();

        let missing = remove_user_game(State(state.clone()), auth_as(user.id), Path(game.id))
            .await
            .unwrap_err();
        assert!(matches!(missing, ApiError::NotFound(_)));

        state
            .db
            .add_user_game(user.id, game.id, SkillLevel::Expert, 300)
            .await
            .unwrap();
        let Json(body) = remove_user_game(State(state.clone()), auth_as(user.id), Path(game.id))
            .await
            .unwrap();
        assert!(body.success);
        assert_eq!(body.message, "Apex Legends removed from your profile");
        assert!(state.db.list_user_games(user.id).await.unwrap().is_empty());
    }
}
