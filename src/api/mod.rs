// HTTP API: shared state, router, and service endpoints.

pub mod auth;
pub mod games;
pub mod matching;
pub mod social;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::auth::{Argon2Scheme, JwtIssuer, PasswordScheme, TokenIssuer};
use crate::config::Config;
use crate::db::Database;
use crate::metrics;
use crate::rate_limit::RateLimiter;
use crate::scoring::{MatchScorer, OverlapScorer};

// ── Shared application state ─────────────────────────────────────────

/// Collaborators every handler can reach. Each one is injected here so
/// alternative implementations can be supplied at construction time.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub passwords: Arc<dyn PasswordScheme>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub scorer: Arc<dyn MatchScorer>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Production wiring: argon2 passwords, JWT tokens, overlap scoring.
    pub fn new(db: Arc<Database>, config: &Config) -> Self {
        Self {
            passwords: Arc::new(Argon2Scheme),
            tokens: Arc::new(JwtIssuer::new(
                &config.jwt_secret,
                config.jwt_expiration_hours,
            )),
            scorer: Arc::new(OverlapScorer::new(db.clone())),
            rate_limiter: RateLimiter::new(),
            db,
        }
    }

    pub fn with_passwords(mut self, passwords: Arc<dyn PasswordScheme>) -> Self {
        self.passwords = passwords;
        self
    }

    pub fn with_tokens(mut self, tokens: Arc<dyn TokenIssuer>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn MatchScorer>) -> Self {
        self.scorer = scorer;
        self
    }
}

/// Payload of every mutation that only needs to confirm success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/docs", get(api_docs))
        .route("/metrics", get(metrics_text))
        // Accounts
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route(
            "/profile",
            get(social::get_profile).put(social::update_profile),
        )
        // Games
        .route("/games", get(games::get_all_games))
        .route("/games/search", get(games::search_games))
        .route(
            "/user/games",
            get(games::list_user_games).post(games::add_user_game),
        )
        .route(
            "/user/games/{game_id}",
            put(games::update_user_game).delete(games::remove_user_game),
        )
        // Matching
        .route("/matches", get(matching::list_matches))
        .route("/matches/find", get(matching::find_matches))
        .route("/matches/{id}/accept", post(matching::accept_match))
        .route("/matches/{id}/reject", post(matching::reject_match))
        // Social
        .route(
            "/messages",
            get(social::list_messages).post(social::send_message),
        )
        .route("/notifications", get(social::list_notifications))
        .route(
            "/notifications/{id}/read",
            post(social::mark_notification_read),
        )
        .route("/stats/platform", get(social::platform_stats))
        .route("/search/players", get(social::search_players))
        .layer(axum::middleware::from_fn(metrics::track_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Service endpoints ─────────────────────────────────────────────────

pub async fn root() -> Json<Value> {
    Json(json!({
        "status": "API is running",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/docs",
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn api_docs() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        crate::docs::API_DOCS,
    )
}

async fn metrics_text() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

/// Clamp an optional page size into `1..=max`, defaulting when absent.
pub(crate) fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}
