//! Route definitions for the `/movements` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::movements;
use crate::state::AppState;

/// Routes mounted at `/movements`.
///
/// ```text
/// GET    /                          -> list_movements
/// POST   /                          -> create_movement
/// GET    /pending                   -> pending_movements
/// GET    /authorizers?area_id=      -> list_authorizers
/// GET    /{id}                      -> get_movement
/// POST   /{id}/approve              -> approve_movement
/// POST   /{id}/reject               -> reject_movement
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(movements::list_movements).post(movements::create_movement),
        )
        .route("/pending", get(movements::pending_movements))
        .route("/authorizers", get(movements::list_authorizers))
        .route("/{id}", get(movements::get_movement))
        .route("/{id}/approve", post(movements::approve_movement))
        .route("/{id}/reject", post(movements::reject_movement))
}
