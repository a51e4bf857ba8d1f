use assetflow_core::scope;
use axum::Json;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;

/// GET /api/v1/scope
///
/// The caller's resolved scope: permitted areas and campuses, custodian
/// identity, and whether they may write.
pub async fn get_scope(auth: AuthUser) -> AppResult<Json<DataResponse<scope::ScopeDescriptor>>> {
    Ok(Json(DataResponse {
        data: scope::resolve(&auth.actor),
    }))
}
