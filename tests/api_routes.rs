// Integration tests driving the full router: service endpoints, route
// wiring, and a register -> library -> matching -> messaging flow with the
// production password and token schemes.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use gamematch_backend::api::{router, AppState};
use gamematch_backend::config::Config;
use gamematch_backend::db::Database;

async fn test_app() -> (Router, Arc<Database>) {
    let db = Arc::new(Database::new("sqlite::memory:").await.unwrap());
    db.seed_games().await.unwrap();
    let state = AppState::new(db.clone(), &Config::default());
    (router(state), db)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn register(app: &Router, name: &str) -> (i64, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/register",
        None,
        Some(json!({
            "email": format!("{name}@example.com"),
            "username": name,
            "password": "correct-horse",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["user"]["id"].as_i64().unwrap(),
        body["token"].as_str().unwrap().to_string(),
    )
}

// ── Service endpoints ────────────────────────────────────────────────

#[tokio::test]
async fn test_root_and_health() {
    let (app, _) = test_app().await;

    let (status, root) = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(root["status"], "API is running");
    assert_eq!(root["docs"], "/docs");

    let (status, health) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health, json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_every_route_is_wired() {
    let (app, _) = test_app().await;
    let routes = [
        (Method::GET, "/docs"),
        (Method::GET, "/metrics"),
        (Method::POST, "/register"),
        (Method::POST, "/login"),
        (Method::GET, "/profile"),
        (Method::PUT, "/profile"),
        (Method::GET, "/games"),
        (Method::GET, "/games/search"),
        (Method::GET, "/user/games"),
        (Method::POST, "/user/games"),
        (Method::PUT, "/user/games/1"),
        (Method::DELETE, "/user/games/1"),
        (Method::GET, "/matches"),
        (Method::GET, "/matches/find"),
        (Method::POST, "/matches/1/accept"),
        (Method::POST, "/matches/1/reject"),
        (Method::GET, "/messages?match_id=1"),
        (Method::POST, "/messages"),
        (Method::GET, "/notifications"),
        (Method::POST, "/notifications/1/read"),
        (Method::GET, "/stats/platform"),
        (Method::GET, "/search/players"),
    ];

    for (method, uri) in routes {
        let (status, _) = send(&app, method.clone(), uri, None, None).await;
        assert_ne!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert_ne!(status, StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
    }
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let (app, _) = test_app().await;

    let (status, body) = send(&app, Method::GET, "/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, Method::GET, "/user/games", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_catalogue() {
    let (app, _) = test_app().await;

    let (status, games) = send(&app, Method::GET, "/games", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!games.as_array().unwrap().is_empty());

    let (status, found) = send(&app, Method::GET, "/games/search?q=Valorant", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found[0]["name"], "Valorant");
}

#[tokio::test]
async fn test_match_search_rate_limit() {
    let (app, _) = test_app().await;
    let (_, token) = register(&app, "eager").await;

    for _ in 0..60 {
        let (status, _) = send(&app, Method::GET, "/matches/find", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, Method::GET, "/matches/find", Some(&token), None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded: max 60 match searches per hour");
}

// ── Full flow ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_register_login_match_and_message() {
    let (app, db) = test_app().await;
    let (alice_id, _) = register(&app, "alice").await;
    let (bob_id, bob_token) = register(&app, "bob").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({
            "email": "ALICE@example.com",
            "username": "alice2",
            "password": "correct-horse",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "wrong-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, login) = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["user"]["email_verified"], false);
    let alice_token = login["token"].as_str().unwrap().to_string();

    let valorant = db
        .search_games(Some("Valorant"), None)
        .await
        .unwrap()
        .remove(0);
    for token in [&alice_token, &bob_token] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/user/games",
            Some(token),
            Some(json!({
                "game_id": valorant.id,
                "skill_level": "advanced",
                "hours_played": 120,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, found) = send(&app, Method::GET, "/matches/find", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let first = &found["matches"][0];
    assert_eq!(first["user_id"], bob_id);
    assert_eq!(first["match_score"], 100);
    assert_eq!(first["common_games"], json!(["Valorant"]));
    let match_id = first["match_id"].as_i64().unwrap();

    // Not accepted yet, so no messaging
    let (status, _) = send(
        &app,
        Method::POST,
        "/messages",
        Some(&alice_token),
        Some(json!({ "match_id": match_id, "content": "gg" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let accept = format!("/matches/{match_id}/accept");
    let (status, body) = send(&app, Method::POST, &accept, Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Match accepted");

    let (status, _) = send(&app, Method::POST, &accept, Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, sent) = send(
        &app,
        Method::POST,
        "/messages",
        Some(&alice_token),
        Some(json!({ "match_id": match_id, "content": "gg" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["sender_id"], alice_id);

    let thread = format!("/messages?match_id={match_id}");
    let (status, messages) = send(&app, Method::GET, &thread, Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages.as_array().unwrap().len(), 1);

    let (_, stats) = send(&app, Method::GET, "/stats/platform", None, None).await;
    assert_eq!(stats["total_users"], 2);
    assert_eq!(stats["accepted_matches"], 1);
    assert_eq!(stats["total_messages"], 1);

    let (_, profile) = send(&app, Method::GET, "/profile", Some(&bob_token), None).await;
    assert_eq!(profile["username"], "bob");
    assert_eq!(profile["games"][0]["name"], "Valorant");
}
