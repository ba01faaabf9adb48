use std::sync::Arc;

use gamematch_backend::{api, config::Config, db::Database, metrics};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::load();
    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    let db = Database::new(&config.database_url)
        .await
        .expect("Failed to initialize database");
    if config.seed_games {
        match db.seed_games().await {
            Ok(0) => {}
            Ok(n) => tracing::info!(games = n, "Seeded starter games"),
            Err(e) => tracing::error!("Failed to seed games: {e}"),
        }
    }
    let db = Arc::new(db);

    metrics::register_metrics();

    let state = api::AppState::new(db, &config);
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!("Gamematch backend listening on {addr}");
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
