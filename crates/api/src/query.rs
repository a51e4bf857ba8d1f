//! Query parameter types shared by several handlers.

use assetflow_core::types::DbId;
use serde::Deserialize;

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    /// If `true`, return only unread notifications. Defaults to `false`.
    pub unread_only: Option<bool>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Query parameters for `GET /asset-types/similar`.
#[derive(Debug, Deserialize)]
pub struct SimilarTypeQuery {
    pub area_id: DbId,
    pub name: String,
}

/// Query parameters for `GET /movements/authorizers`.
#[derive(Debug, Deserialize)]
pub struct AuthorizerQuery {
    pub area_id: DbId,
}
