use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{connections, health, sync};
use crate::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))

        // Calendar connection routes
        .route(
            "/connections",
            get(connections::list_connections).post(connections::create_connection),
        )
        .route(
            "/connections/:id",
            get(connections::get_connection).put(connections::update_connection),
        )

        // Sync routes
        .route("/connections/:id/sync", post(sync::sync_connection))
        .route("/properties/:id/sync", post(sync::sync_property))
        .route("/sync/run", post(sync::run_sync))
        .route("/sync/status", get(sync::get_sync_status))
}
