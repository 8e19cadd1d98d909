//! Handlers for the caller's own playground sessions
//! (`/playground/sessions`).
//!
//! Every lookup is scoped to `(id, caller)`, so a session owned by someone
//! else is reported exactly like one that does not exist.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use playground_core::pagination::{PageRequest, Pagination};
use playground_core::session::{MessageDraft, SessionDraft, SessionFields, SessionPatch};
use playground_core::types::DbId;
use playground_db::models::session::{OwnedSessionFilter, PlaygroundSession, SessionSummary};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /playground/sessions`.
#[derive(Debug, Default, Deserialize)]
pub struct ListSessionsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

/// Request body for `POST /playground/sessions/{id}/messages`.
#[derive(Debug, Deserialize)]
pub struct AddMessageRequest {
    pub role: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionData {
    pub session: PlaygroundSession,
}

/// A page of sessions plus pagination metadata.
#[derive(Debug, Serialize)]
pub struct SessionList<T> {
    pub sessions: Vec<T>,
    pub pagination: Pagination,
}

/// Blank search input means "no filter".
pub(crate) fn normalize_search(search: Option<String>) -> Option<String> {
    search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn session_response(message: &str, session: PlaygroundSession) -> Json<ApiResponse<SessionData>> {
    Json(ApiResponse::ok(message, SessionData { session }))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/playground/sessions
///
/// The caller's sessions, most recently modified first, without transcripts.
pub async fn list_sessions(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ListSessionsQuery>,
) -> AppResult<Json<ApiResponse<SessionList<SessionSummary>>>> {
    let page = PageRequest::new(query.page, query.limit)?;
    let filter = OwnedSessionFilter {
        search: normalize_search(query.search),
    };

    let result = state
        .store
        .list_owned_sessions(auth.user_id, &filter, page)
        .await?;

    let pagination = Pagination::new(page, result.items.len(), result.total_count);
    Ok(Json(ApiResponse::ok(
        "Sessions retrieved successfully",
        SessionList {
            sessions: result.items,
            pagination,
        },
    )))
}

/// GET /api/v1/playground/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<SessionData>>> {
    let session = state
        .store
        .find_owned_session(id, auth.user_id)
        .await?
        .ok_or_else(AppError::session_not_found)?;

    Ok(session_response("Session retrieved successfully", session))
}

/// POST /api/v1/playground/sessions
///
/// Returns 201 with the full session.
pub async fn create_session(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<SessionFields>,
) -> AppResult<(StatusCode, Json<ApiResponse<SessionData>>)> {
    let draft = SessionDraft::from_fields(input)?;
    let session = state.store.insert_session(auth.user_id, &draft).await?;

    tracing::info!(user_id = auth.user_id, session_id = session.id, "Session created");

    Ok((
        StatusCode::CREATED,
        session_response("Session created successfully", session),
    ))
}

/// PUT /api/v1/playground/sessions/{id}
///
/// Partial update. Every supplied field is validated before anything is
/// written; a single invalid field rejects the whole request.
pub async fn update_session(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DbId>,
    ApiJson(input): ApiJson<SessionFields>,
) -> AppResult<Json<ApiResponse<SessionData>>> {
    let patch = SessionPatch::from_fields(input)?;

    let session = state
        .store
        .update_owned_session(id, auth.user_id, &patch)
        .await?
        .ok_or_else(AppError::session_not_found)?;

    tracing::debug!(user_id = auth.user_id, session_id = id, "Session updated");

    Ok(session_response("Session updated successfully", session))
}

/// POST /api/v1/playground/sessions/{id}/messages
///
/// Append one message to the end of the transcript.
pub async fn add_message(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DbId>,
    ApiJson(input): ApiJson<AddMessageRequest>,
) -> AppResult<Json<ApiResponse<SessionData>>> {
    let message = MessageDraft::new(input.role.as_deref(), input.content.as_deref())?;

    let session = state
        .store
        .append_message(id, auth.user_id, message)
        .await?
        .ok_or_else(AppError::session_not_found)?;

    tracing::debug!(
        user_id = auth.user_id,
        session_id = id,
        messages = session.messages.len(),
        "Message appended"
    );

    Ok(session_response("Message added successfully", session))
}

/// DELETE /api/v1/playground/sessions/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DbId>,
) -> AppResult<Json<ApiResponse<()>>> {
    if !state.store.delete_owned_session(id, auth.user_id).await? {
        return Err(AppError::session_not_found());
    }

    tracing::info!(user_id = auth.user_id, session_id = id, "Session deleted");
    Ok(Json(ApiResponse::done("Session deleted successfully")))
}
