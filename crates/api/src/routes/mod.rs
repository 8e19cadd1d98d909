pub mod auth;
pub mod health;
pub mod playground;
pub mod user;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                          register (public)
/// /auth/login                             login (public)
/// /auth/refresh                           refresh (public)
/// /auth/logout                            logout (requires auth)
///
/// /user/profile                           get, update (requires auth)
/// /user/password                          change password (requires auth)
///
/// /playground/sessions                    list, create (requires auth)
/// /playground/sessions/{id}               get, update, delete (requires auth)
/// /playground/sessions/{id}/messages      append message (requires auth)
/// /playground/public                      public discovery (optional auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/user", user::router())
        .nest("/playground", playground::router())
}
