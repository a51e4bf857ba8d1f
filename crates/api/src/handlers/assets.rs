//! Handlers for assets and asset types.
//!
//! Every asset is addressed by its internal code. Scope checks live in the
//! core registry functions; these handlers only translate HTTP.

use assetflow_core::assets::registry::{self, AssetRegistration};
use assetflow_core::store::AssetFilter;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::SimilarTypeQuery;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /assets/{code}/label`.
#[derive(Debug, Deserialize)]
pub struct LabelRequest {
    pub label: String,
}

/// POST /api/v1/assets
pub async fn register_asset(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<AssetRegistration>,
) -> AppResult<impl IntoResponse> {
    let asset = registry::register_asset(
        state.store.as_ref(),
        state.event_bus.as_ref(),
        &auth.ctx,
        &input,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: asset })))
}

/// GET /api/v1/assets
pub async fn list_assets(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<AssetFilter>,
) -> AppResult<impl IntoResponse> {
    let assets = registry::list_assets(state.store.as_ref(), &auth.ctx, &filter).await?;
    Ok(Json(DataResponse { data: assets }))
}

/// GET /api/v1/assets/{code}
pub async fn get_asset(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let asset = registry::get_asset(state.store.as_ref(), &auth.ctx, &code).await?;
    Ok(Json(DataResponse { data: asset }))
}

/// PUT /api/v1/assets/{code}/label
pub async fn assign_label(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(input): Json<LabelRequest>,
) -> AppResult<impl IntoResponse> {
    let asset = registry::assign_label(
        state.store.as_ref(),
        state.event_bus.as_ref(),
        &auth.ctx,
        &code,
        &input.label,
    )
    .await?;
    Ok(Json(DataResponse { data: asset }))
}

/// GET /api/v1/assets/{code}/history
///
/// Audit records for the asset, newest first.
pub async fn asset_history(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let records = registry::asset_history(state.store.as_ref(), &auth.ctx, &code).await?;
    Ok(Json(DataResponse { data: records }))
}

/// GET /api/v1/asset-types/similar?area_id=&name=
///
/// Advisory only; never blocks creating the type.
pub async fn similar_type_names(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<SimilarTypeQuery>,
) -> AppResult<impl IntoResponse> {
    let advice =
        registry::similar_type_names(state.store.as_ref(), params.area_id, &params.name).await?;
    Ok(Json(DataResponse { data: advice }))
}
