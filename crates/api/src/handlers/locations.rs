//! Handlers for the location hierarchy.
//!
//! Writes go through [`RequireAdmin`]; reads only need [`AuthUser`].

use assetflow_core::location::{self, BlockRequest, RoomRequest};
use assetflow_core::types::DbId;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /locations/sites/{id}/code`.
#[derive(Debug, Deserialize)]
pub struct SiteCodeRequest {
    pub official_code: u32,
}

/// POST /api/v1/locations/blocks
pub async fn create_block(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<BlockRequest>,
) -> AppResult<impl IntoResponse> {
    let block = location::create_block(state.store.as_ref(), &input).await?;
    tracing::info!(
        block_id = block.id,
        site_id = block.site_id,
        admin_id = admin.actor.id,
        "Block created",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: block })))
}

/// POST /api/v1/locations/rooms
///
/// 201 when a new room was allocated, 200 when the `(block, floor, number)`
/// key already had one.
pub async fn allocate_room(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<RoomRequest>,
) -> AppResult<impl IntoResponse> {
    let allocation = location::allocate_room(state.store.as_ref(), &input).await?;
    let status = if allocation.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(DataResponse { data: allocation.room })))
}

/// PUT /api/v1/locations/sites/{id}/code
pub async fn rename_site_code(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(site_id): Path<DbId>,
    Json(input): Json<SiteCodeRequest>,
) -> AppResult<impl IntoResponse> {
    let site = location::rename_site_code(state.store.as_ref(), site_id, input.official_code).await?;
    tracing::info!(
        site_id,
        official_code = site.official_code,
        admin_id = admin.actor.id,
        "Site code changed",
    );
    Ok(Json(DataResponse { data: site }))
}

/// GET /api/v1/locations/campuses/{id}/sites
pub async fn list_sites(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(campus_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let sites = location::sites_under(state.store.as_ref(), campus_id).await?;
    Ok(Json(DataResponse { data: sites }))
}

/// GET /api/v1/locations/sites/{id}/blocks
pub async fn list_blocks(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(site_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let blocks = location::blocks_under(state.store.as_ref(), site_id).await?;
    Ok(Json(DataResponse { data: blocks }))
}

/// GET /api/v1/locations/blocks/{id}/rooms
pub async fn list_rooms(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(block_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let rooms = location::rooms_under(state.store.as_ref(), block_id).await?;
    Ok(Json(DataResponse { data: rooms }))
}

/// GET /api/v1/locations/rooms/by-code/{code}
pub async fn get_room_by_code(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let room = location::room_by_code(state.store.as_ref(), &code).await?;
    Ok(Json(DataResponse { data: room }))
}
