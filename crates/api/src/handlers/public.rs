//! Public session discovery (`/playground/public`). Open to anonymous callers.

use axum::extract::State;
use axum::Json;
use playground_core::pagination::{PageRequest, Pagination};
use playground_core::session::parse_tag_filter;
use playground_db::models::session::{PublicSession, PublicSessionFilter};
use serde::Deserialize;

use super::sessions::{normalize_search, SessionList};
use crate::error::AppResult;
use crate::extract::ApiQuery;
use crate::middleware::auth::MaybeAuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Query parameters for `GET /playground/public`.
#[derive(Debug, Default, Deserialize)]
pub struct PublicSessionsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    /// Comma-separated; a session matches if it has any of them.
    pub tags: Option<String>,
}

/// GET /api/v1/playground/public
///
/// Public sessions, most recently created first, with the owner reduced to
/// name and avatar and without transcripts.
pub async fn list_public_sessions(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    ApiQuery(query): ApiQuery<PublicSessionsQuery>,
) -> AppResult<Json<ApiResponse<SessionList<PublicSession>>>> {
    let page = PageRequest::new(query.page, query.limit)?;
    let filter = PublicSessionFilter {
        search: normalize_search(query.search),
        tags: query.tags.as_deref().map(parse_tag_filter).unwrap_or_default(),
    };

    tracing::debug!(
        viewer_id = viewer.as_ref().map(|v| v.user_id),
        tags = ?filter.tags,
        "Listing public sessions"
    );

    let result = state.store.list_public_sessions(&filter, page).await?;

    let pagination = Pagination::new(page, result.items.len(), result.total_count);
    Ok(Json(ApiResponse::ok(
        "Public sessions retrieved successfully",
        SessionList {
            sessions: result.items,
            pagination,
        },
    )))
}
