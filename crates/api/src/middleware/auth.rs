//! Bearer-token authentication extractors for Axum handlers.
//!
//! Both extractors share one resolution path: read the `Authorization`
//! header, verify the access token, and load the user it names. They differ
//! only in what happens when any step fails.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use playground_core::types::DbId;
use playground_db::models::user::User;

use crate::auth::jwt::{verify_token, TokenKind};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated caller, resolved to a live user record.
///
/// Rejects with 401 when the header is missing or malformed, the token fails
/// verification (expired and malformed are not distinguished), or the user no
/// longer exists. A storage fault during resolution becomes a 500.
///
/// ```ignore
/// async fn my_handler(auth: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = auth.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub user: User,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| AppError::unauthorized("Access token required"))?;
        resolve(token, state).await
    }
}

/// Caller identity if one can be established, otherwise `None`.
///
/// Every failure, including storage faults, is treated as "anonymous".
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(MaybeAuthUser(None));
        };

        match resolve(token, state).await {
            Ok(user) => Ok(MaybeAuthUser(Some(user))),
            Err(AppError::Store(e)) => {
                tracing::warn!(error = %e, "Optional auth lookup failed, continuing anonymously");
                Ok(MaybeAuthUser(None))
            }
            Err(e) => {
                tracing::debug!(error = %e, "Optional auth rejected, continuing anonymously");
                Ok(MaybeAuthUser(None))
            }
        }
    }
}

/// The token from an `Authorization: Bearer <token>` header, if well-formed.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn resolve(token: &str, state: &AppState) -> Result<AuthUser, AppError> {
    let claims = verify_token(token, TokenKind::Access, &state.config.jwt)
        .map_err(|_| AppError::unauthorized("Invalid or expired token"))?;

    let user = state
        .store
        .find_user_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;

    Ok(AuthUser {
        user_id: user.id,
        user,
    })
}
