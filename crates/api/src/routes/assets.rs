//! Route definitions for assets and asset types.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::assets;
use crate::state::AppState;

/// Asset routes, merged at the API root.
///
/// ```text
/// GET    /assets                    -> list_assets
/// POST   /assets                    -> register_asset
/// GET    /assets/{code}             -> get_asset
/// PUT    /assets/{code}/label       -> assign_label
/// GET    /assets/{code}/history     -> asset_history
/// GET    /asset-types/similar       -> similar_type_names
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/assets",
            get(assets::list_assets).post(assets::register_asset),
        )
        .route("/assets/{code}", get(assets::get_asset))
        .route("/assets/{code}/label", put(assets::assign_label))
        .route("/assets/{code}/history", get(assets::asset_history))
        .route("/asset-types/similar", get(assets::similar_type_names))
}
