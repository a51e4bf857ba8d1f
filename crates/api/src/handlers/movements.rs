//! Handlers for the `/movements` resource.
//!
//! All endpoints require authentication via [`AuthUser`]. The workflow
//! enforces who may request and resolve each movement.

use assetflow_core::movement::{Decision, MovementFilter, MovementRequest};
use assetflow_core::types::DbId;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::AuthorizerQuery;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /movements/{id}/reject`.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

/// POST /api/v1/movements
pub async fn create_movement(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<MovementRequest>,
) -> AppResult<impl IntoResponse> {
    let movement = state.workflow.create_movement(&auth.ctx, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: movement })))
}

/// GET /api/v1/movements?status=&requester_id=&authorizer_id=
pub async fn list_movements(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<MovementFilter>,
) -> AppResult<impl IntoResponse> {
    let movements = state.workflow.list_movements(&auth.ctx, &filter).await?;
    Ok(Json(DataResponse { data: movements }))
}

/// GET /api/v1/movements/pending
pub async fn pending_movements(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let movements = state.workflow.pending_for_authorizer(&auth.ctx).await?;
    Ok(Json(DataResponse { data: movements }))
}

/// GET /api/v1/movements/authorizers?area_id=
///
/// Active admins plus the active supervisors of the area.
pub async fn list_authorizers(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AuthorizerQuery>,
) -> AppResult<impl IntoResponse> {
    let candidates = state.workflow.eligible_authorizers(query.area_id).await?;
    Ok(Json(DataResponse { data: candidates }))
}

/// GET /api/v1/movements/{id}
pub async fn get_movement(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(movement_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let movement = state.workflow.get_movement(&auth.ctx, movement_id).await?;
    Ok(Json(DataResponse { data: movement }))
}

/// POST /api/v1/movements/{id}/approve
pub async fn approve_movement(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(movement_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let movement = state
        .workflow
        .resolve_movement(&auth.ctx, movement_id, Decision::Approve)
        .await?;
    Ok(Json(DataResponse { data: movement }))
}

/// POST /api/v1/movements/{id}/reject
pub async fn reject_movement(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(movement_id): Path<DbId>,
    Json(input): Json<RejectRequest>,
) -> AppResult<impl IntoResponse> {
    let movement = state
        .workflow
        .resolve_movement(
            &auth.ctx,
            movement_id,
            Decision::Reject {
                reason: input.reason,
            },
        )
        .await?;
    Ok(Json(DataResponse { data: movement }))
}
