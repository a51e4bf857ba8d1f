pub mod assets;
pub mod health;
pub mod locations;
pub mod movements;
pub mod notifications;
pub mod scope;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /health                                          service health
///
/// /locations/blocks                                create block (admin)
/// /locations/campuses/{id}/sites                   sites under campus
/// /locations/sites/{id}/blocks                     blocks under site
/// /locations/sites/{id}/code                       rename site code (admin)
/// /locations/blocks/{id}/rooms                     rooms under block
/// /locations/rooms                                 allocate room (admin)
/// /locations/rooms/by-code/{code}                  room lookup
///
/// /assets                                          list, register
/// /assets/{code}                                   get
/// /assets/{code}/label                             assign label (PUT)
/// /assets/{code}/history                           audit records
/// /asset-types/similar                             similar-name advisory
///
/// /scope                                           caller's scope
///
/// /movements                                       list, create
/// /movements/pending                               review queue
/// /movements/{id}                                  get
/// /movements/{id}/approve                          approve (POST)
/// /movements/{id}/reject                           reject (POST)
///
/// /notifications                                   list
/// /notifications/unread-count                      unread count
/// /notifications/read-all                          mark all read (POST)
/// /notifications/{id}/read                         mark read (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/locations", locations::router())
        .merge(assets::router())
        .nest("/scope", scope::router())
        .nest("/movements", movements::router())
        .nest("/notifications", notifications::router())
}
