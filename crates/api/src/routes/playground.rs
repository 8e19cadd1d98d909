//! Route definitions for the `/playground` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{public, sessions};
use crate::state::AppState;

/// Routes mounted at `/playground`.
///
/// ```text
/// GET    /sessions                -> list_sessions
/// POST   /sessions                -> create_session
/// GET    /sessions/{id}           -> get_session
/// PUT    /sessions/{id}           -> update_session
/// DELETE /sessions/{id}           -> delete_session
/// POST   /sessions/{id}/messages  -> add_message
/// GET    /public                  -> list_public_sessions (optional auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route(
            "/sessions/{id}",
            get(sessions::get_session)
                .put(sessions::update_session)
                .delete(sessions::delete_session),
        )
        .route("/sessions/{id}/messages", post(sessions::add_message))
        .route("/public", get(public::list_public_sessions))
}
