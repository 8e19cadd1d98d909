//! Route definitions for the `/user` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::user;
use crate::state::AppState;

/// Routes mounted at `/user`. All require auth.
///
/// ```text
/// GET  /profile   -> get_profile
/// PUT  /profile   -> update_profile
/// PUT  /password  -> change_password
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(user::get_profile).put(user::update_profile),
        )
        .route("/password", put(user::change_password))
}
