use axum::{
    extract::{Path, State},
    Json,
};
use calendar_sync::db::connections;
use shared::api::SyncStatusResponse;
use shared::{SyncResult, SyncSummary};
use uuid::Uuid;

use crate::error::{ApiResult, AppError};
use crate::state::AppState;

/// Sync one connection now
pub async fn sync_connection(
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
) -> ApiResult<Json<SyncResult>> {
    state
        .engine
        .sync_connection_by_id(connection_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Calendar connection"))
}

/// Host-triggered "sync now" for every feed of a property
pub async fn sync_property(
    State(state): State<AppState>,
    Path(property_id): Path<Uuid>,
) -> ApiResult<Json<SyncSummary>> {
    let summary = state.engine.sync_property(property_id).await?;
    Ok(Json(summary))
}

/// Run the full batch on demand
pub async fn run_sync(State(state): State<AppState>) -> ApiResult<Json<SyncSummary>> {
    let summary = state.engine.sync_all().await?;
    Ok(Json(summary))
}

pub async fn get_sync_status(State(state): State<AppState>) -> ApiResult<Json<SyncStatusResponse>> {
    let mut conn = state.pool.get().await?;
    let all = connections::list_all(&mut conn).await?;

    Ok(Json(SyncStatusResponse::from_connections(&all)))
}
