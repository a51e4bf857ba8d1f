use axum::routing::get;
use axum::Router;

use crate::handlers::scope;
use crate::state::AppState;

/// Routes mounted at `/scope`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(scope::get_scope))
}
