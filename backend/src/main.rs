mod config;
mod error;
mod handlers;
mod routes;
mod state;

use anyhow::Result;
use axum::{
    http::{header, Method},
    Router,
};
use calendar_sync::db::{self, PgSyncStore};
use calendar_sync::{HttpFeedFetcher, PgSyncEngine, SyncScheduler};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::routes::api_routes;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,calendar_sync=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    tracing::info!("Starting availability backend");

    // Initialize database pool
    let pool = db::establish_connection_pool(&config.database)?;
    tracing::info!("Database connection pool initialized");

    let fetcher = HttpFeedFetcher::from_config(&config.sync)?;
    let engine = PgSyncEngine::new(
        Arc::new(PgSyncStore::new(pool.clone())),
        Arc::new(fetcher),
        &config.sync,
    );

    // Start the recurring calendar sync
    if config.sync.scheduler_enabled {
        SyncScheduler::new(engine.clone(), config.sync.interval()).spawn();
    } else {
        tracing::info!("Calendar sync scheduler disabled");
    }

    let app = create_app(AppState { pool, engine });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn create_app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
        .with_state(state)
}

/// CORS from CORS_ALLOWED_ORIGINS (comma separated). Permissive when unset.
fn build_cors_layer() -> CorsLayer {
    let origins: Vec<_> = std::env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!(
            "CORS_ALLOWED_ORIGINS not set, using permissive CORS (not recommended for production)"
        );
        return CorsLayer::permissive();
    }

    tracing::info!("CORS configured for origins: {:?}", origins);
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
