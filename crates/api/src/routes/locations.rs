//! Route definitions for the location hierarchy.
//!
//! Reads require authentication; writes require an admin.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::locations;
use crate::state::AppState;

/// Routes mounted at `/locations`.
///
/// ```text
/// POST   /blocks                    -> create_block
/// GET    /campuses/{id}/sites       -> list_sites
/// GET    /sites/{id}/blocks         -> list_blocks
/// PUT    /sites/{id}/code           -> rename_site_code
/// GET    /blocks/{id}/rooms         -> list_rooms
/// POST   /rooms                     -> allocate_room
/// GET    /rooms/by-code/{code}      -> get_room_by_code
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/blocks", post(locations::create_block))
        .route("/campuses/{id}/sites", get(locations::list_sites))
        .route("/sites/{id}/blocks", get(locations::list_blocks))
        .route("/sites/{id}/code", put(locations::rename_site_code))
        .route("/blocks/{id}/rooms", get(locations::list_rooms))
        .route("/rooms", post(locations::allocate_room))
        .route("/rooms/by-code/{code}", get(locations::get_room_by_code))
}
