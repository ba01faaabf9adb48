// Registration and login handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::AppState;
use crate::error::{is_unique_violation, ApiError, ApiResult};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public projection returned after registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: i64,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub token: String,
    pub user: UserPublic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub email_verified: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: LoginUser,
}

pub(crate) fn validate_username(username: &str) -> ApiResult<()> {
    let len = username.trim().chars().count();
    if !(3..=30).contains(&len) {
        return Err(ApiError::bad_request("username must be 3-30 characters"));
    }
    Ok(())
}

fn validate_registration(req: &RegisterRequest) -> ApiResult<()> {
    if !req.email.contains('@') {
        return Err(ApiError::bad_request("Invalid email format"));
    }
    validate_username(&req.username)?;
    if req.password.chars().count() < 8 {
        return Err(ApiError::bad_request(
            "password must be at least 8 characters",
        ));
    }
    Ok(())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    validate_registration(&req)?;
    let email = normalize_email(&req.email);

    if state.db.get_user_by_email(&email).await?.is_some() {
        warn!("Registration with an existing email");
        return Err(ApiError::conflict("Email already registered"));
    }

    let password_hash = state.passwords.hash(&req.password)?;
    let bio = req.bio.as_deref().unwrap_or_default();

    let user = match state
        .db
        .create_user(&email, req.username.trim(), &password_hash, bio)
        .await
    {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::conflict("Email already registered"));
        }
        Err(e) => return Err(e.into()),
    };

    let token = state.tokens.issue(user.id)?;
    metrics::REGISTRATIONS_TOTAL.inc();
    info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            token,
            user: UserPublic {
                id: user.id,
                email: user.email,
                username: user.username,
            },
        }),
    ))
}

/// A stored hash that cannot be parsed counts as a mismatch.
fn password_matches(state: &AppState, password: &str, hash: &str) -> bool {
    match state.passwords.verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            error!("Unusable password hash on file: {e}");
            false
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let email = normalize_email(&req.email);

    let user = match state.db.get_user_by_email(&email).await? {
        Some(user) if password_matches(&state, &req.password, &user.password_hash) => user,
        _ => {
            metrics::LOGINS_TOTAL.with_label_values(&["failure"]).inc();
            warn!("Rejected login attempt");
            return Err(ApiError::unauthorized("Invalid email or password"));
        }
    };

    let token = state.tokens.issue(user.id)?;
    metrics::LOGINS_TOTAL.with_label_values(&["success"]).inc();
    info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        success: true,
        token,
        user: LoginUser {
            id: user.id,
            email_verified: user.is_email_verified(),
            username: user.username,
            email: user.email,
        },
    }))
}
