use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use chat_common::SnowflakeGenerator;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_api::config::Config;
use chat_api::db::memory::MemoryStore;
use chat_api::db::pg::PgStore;
use chat_api::db::seed;
use chat_api::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing, env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let state = match config.database_url.clone() {
        Some(database_url) => {
            let pool = chat_api::db::pool::connect(&database_url, config.db_pool_size)
                .expect("failed to build connection pool");
            let snowflake = Arc::new(SnowflakeGenerator::new(config.worker_id));
            let store = Arc::new(PgStore::new(pool, snowflake));
            tracing::info!("using postgres store");
            AppState::new(config, store.clone(), store)
        }
        None => {
            let store = Arc::new(MemoryStore::with_worker_id(config.worker_id));
            if config.seed_defaults {
                let seeded = seed::seed_default_channels(&store);
                tracing::info!(seeded, "seeded default channels");
                let users = seed::seed_demo_users(&store);
                tracing::info!(users = ?users, "seeded demo users, join with one of these ids");
            } else {
                tracing::warn!("seeding disabled, joins fail until users are inserted");
            }
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            AppState::in_memory(config, store)
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(chat_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "chat-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
