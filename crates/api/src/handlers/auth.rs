//! Handlers for the `/auth` resource (register, login, refresh, logout).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use playground_core::account::Registration;
use playground_core::error::{CoreError, FieldError};
use playground_core::types::DbId;
use playground_db::models::user::{CreateUser, UserResponse};
use playground_db::StoreError;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::{issue_token_pair, verify_token, TokenKind, TokenPair};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Login failures never reveal whether the email exists.
const BAD_CREDENTIALS: &str = "Invalid email or password";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// Payload returned by register and login.
#[derive(Debug, Serialize)]
pub struct AuthData {
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create an account and sign the new user in. Returns 201.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthData>>)> {
    let registration = Registration::new(
        &input.name,
        &input.email,
        &input.password,
        state.config.password_min_length,
    )?;

    let password_hash = hash_password(&registration.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = state
        .store
        .create_user(&CreateUser {
            email: registration.email,
            password_hash,
            name: registration.name,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::Core(CoreError::Conflict(
                "User already exists with this email".into(),
            )),
            other => other.into(),
        })?;

    tracing::info!(user_id = user.id, "User registered");

    let tokens = tokens_for(user.id, &state)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "User registered successfully",
            AuthData {
                user: UserResponse::from(&user),
                tokens,
            },
        )),
    ))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. Unknown email and wrong password
/// produce the same 401.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthData>>> {
    let mut errors = Vec::new();
    if input.email.trim().is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
    }
    if input.password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }
    if !errors.is_empty() {
        return Err(CoreError::Validation(errors).into());
    }

    let email = input.email.trim().to_lowercase();
    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::unauthorized(BAD_CREDENTIALS))?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::info!(user_id = user.id, "Login rejected: wrong password");
        return Err(AppError::unauthorized(BAD_CREDENTIALS));
    }

    state.store.record_login(user.id).await?;
    let user = state
        .store
        .find_user_by_id(user.id)
        .await?
        .unwrap_or(user);

    tracing::info!(user_id = user.id, "User logged in");

    let tokens = tokens_for(user.id, &state)?;
    Ok(Json(ApiResponse::ok(
        "Login successful",
        AuthData {
            user: UserResponse::from(&user),
            tokens,
        },
    )))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a valid refresh token for a fresh token pair. The old pair is
/// not revoked; it simply expires.
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RefreshRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    if input.refresh_token.is_empty() {
        return Err(CoreError::invalid("refreshToken", "Refresh token is required").into());
    }

    let claims = verify_token(&input.refresh_token, TokenKind::Refresh, &state.config.jwt)
        .map_err(|_| AppError::unauthorized("Invalid or expired refresh token"))?;

    let user = state
        .store
        .find_user_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;

    let tokens = tokens_for(user.id, &state)?;
    Ok(Json(ApiResponse::ok("Token refreshed successfully", tokens)))
}

/// POST /api/v1/auth/logout
///
/// Tokens are stateless, so this only confirms the caller was signed in; the
/// client discards its tokens.
pub async fn logout(auth: AuthUser) -> Json<ApiResponse<()>> {
    tracing::info!(user_id = auth.user_id, "User logged out");
    Json(ApiResponse::done("Logout successful"))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn tokens_for(user_id: DbId, state: &AppState) -> AppResult<TokenPair> {
    issue_token_pair(user_id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))
}
