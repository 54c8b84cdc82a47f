use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use calendar_sync::db::connections;
use shared::api::{
    ConnectionResponse, CreateConnectionRequest, ListConnectionsQuery, ListConnectionsResponse,
    UpdateConnectionRequest,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiResult, AppError};
use crate::state::AppState;

pub async fn list_connections(
    State(state): State<AppState>,
    Query(query): Query<ListConnectionsQuery>,
) -> ApiResult<Json<ListConnectionsResponse>> {
    let mut conn = state.pool.get().await?;

    let found = match query.property_id {
        Some(property_id) => connections::list_for_property(&mut conn, property_id).await?,
        None => connections::list_all(&mut conn).await?,
    };

    let connections: Vec<ConnectionResponse> = found.into_iter().map(Into::into).collect();
    Ok(Json(ListConnectionsResponse {
        total: connections.len(),
        connections,
    }))
}

pub async fn create_connection(
    State(state): State<AppState>,
    Json(payload): Json<CreateConnectionRequest>,
) -> ApiResult<(StatusCode, Json<ConnectionResponse>)> {
    payload.validate()?;

    let mut conn = state.pool.get().await?;
    let connection =
        connections::create(&mut conn, payload.property_id, &payload.url, &payload.label).await?;

    tracing::info!(
        connection_id = %connection.id,
        "Registered calendar feed '{}'",
        connection.label
    );

    Ok((StatusCode::CREATED, Json(connection.into())))
}

pub async fn get_connection(
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
) -> ApiResult<Json<ConnectionResponse>> {
    let mut conn = state.pool.get().await?;

    connections::get_by_id(&mut conn, connection_id)
        .await?
        .map(|c| Json(c.into()))
        .ok_or_else(|| AppError::not_found("Calendar connection"))
}

pub async fn update_connection(
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
    Json(payload): Json<UpdateConnectionRequest>,
) -> ApiResult<Json<ConnectionResponse>> {
    payload.validate()?;

    let mut conn = state.pool.get().await?;

    connections::update(
        &mut conn,
        connection_id,
        payload.property_id,
        payload.url.as_deref(),
        payload.label.as_deref(),
    )
    .await?
    .map(|c| Json(c.into()))
    .ok_or_else(|| AppError::not_found("Calendar connection"))
}
