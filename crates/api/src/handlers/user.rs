//! Handlers for the signed-in user's own account (`/user`).

use axum::extract::State;
use axum::Json;
use playground_core::account::{validate_avatar, validate_display_name, validate_password_strength};
use playground_core::error::CoreError;
use playground_db::models::user::{UpdateProfile, UserResponse};
use serde::{Deserialize, Serialize};

use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Request body for `PUT /user/profile`. Omitted fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub avatar: Option<String>,
}

/// Request body for `PUT /user/password`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: UserResponse,
}

/// GET /api/v1/user/profile
pub async fn get_profile(auth: AuthUser) -> Json<ApiResponse<UserData>> {
    Json(ApiResponse::ok(
        "Profile retrieved successfully",
        UserData {
            user: UserResponse::from(&auth.user),
        },
    ))
}

/// PUT /api/v1/user/profile
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<UserData>>> {
    let name = input
        .name
        .as_deref()
        .map(validate_display_name)
        .transpose()?;
    if let Some(avatar) = &input.avatar {
        validate_avatar(avatar)?;
    }

    let user = state
        .store
        .update_profile(
            auth.user_id,
            &UpdateProfile {
                name,
                avatar: input.avatar,
            },
        )
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;

    tracing::info!(user_id = user.id, "Profile updated");

    Ok(Json(ApiResponse::ok(
        "Profile updated successfully",
        UserData {
            user: UserResponse::from(&user),
        },
    )))
}

/// PUT /api/v1/user/password
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    if input.current_password.is_empty() {
        return Err(
            CoreError::invalid("currentPassword", "Current password is required").into(),
        );
    }
    validate_password_strength(&input.new_password, state.config.password_min_length)
        .map_err(|_| {
            CoreError::invalid(
                "newPassword",
                format!(
                    "New password must be at least {} characters long",
                    state.config.password_min_length
                ),
            )
        })?;

    let matches = verify_password(&input.current_password, &auth.user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !matches {
        return Err(CoreError::invalid("currentPassword", "Current password is incorrect").into());
    }

    let password_hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let updated = state
        .store
        .update_password(auth.user_id, &password_hash)
        .await?;
    if !updated {
        return Err(AppError::unauthorized("User not found"));
    }

    tracing::info!(user_id = auth.user_id, "Password changed");
    Ok(Json(ApiResponse::done("Password updated successfully")))
}
