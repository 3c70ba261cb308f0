//! Login, logout and current user

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use crm_auth::{verify_password, AuthError};
use crm_db::{Repository, UserRepository, UserRow};
use crm_models::{CheckInput, LoginRequest};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, AppState, AuthenticatedUser};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    expires_in: i64,
    user: UserRow,
}

#[derive(Debug, Serialize)]
struct MeResponse {
    user: UserRow,
    permissions: Vec<&'static str>,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(dto): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    dto.check()?;

    let repo = UserRepository::new(state.pool.clone());
    let user = repo
        .find_by_email(&dto.email)
        .await?
        .filter(|user| user.active)
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(&dto.password, &user.password_hash) {
        tracing::info!(user_id = user.id, "Login rejected");
        return Err(AuthError::InvalidCredentials.into());
    }

    let jwt = state.auth.jwt();
    let token = jwt
        .create_token(user.id, &user.email, user.role())
        .map_err(|e| ApiError::internal(e.to_string()))?;
    repo.update_last_login(user.id).await?;

    tracing::info!(user_id = user.id, role = %user.role(), "User logged in");

    let cookie = state.auth.cookie().build_cookie(&token);
    let body = LoginResponse {
        token,
        expires_in: jwt.expires_in_seconds(),
        user,
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, state.auth.cookie().clear_cookie())],
    )
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let row = UserRepository::new(state.pool.clone()).get(user.id).await?;
    Ok(Json(MeResponse {
        user: row,
        permissions: user.permissions(),
    }))
}
