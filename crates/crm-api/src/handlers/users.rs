//! User administration

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crm_auth::{builtin::ADMIN_MANAGE, hash_password};
use crm_core::Id;
use crm_db::{NewUser, Repository, UserChanges, UserRepository};
use crm_models::{user::check_password, CheckInput, CreateUser, UpdateUser};

use super::page;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, ApiPath, AppState, AuthenticatedUser, Pagination};

fn checked_hash(state: &AppState, password: &str) -> ApiResult<String> {
    check_password(password, state.config.auth.password_min_length)
        .map_err(|msg| ApiError::invalid_field("password", msg))?;
    Ok(hash_password(password)?)
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
) -> ApiResult<impl IntoResponse> {
    user.require(ADMIN_MANAGE)?;

    let result = UserRepository::new(state.pool.clone()).paginate(&pagination).await?;
    Ok(page(result, &pagination))
}

/// GET /api/admin/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    user.require(ADMIN_MANAGE)?;

    let row = UserRepository::new(state.pool.clone()).get(id).await?;
    Ok(Json(row))
}

/// POST /api/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(dto): ApiJson<CreateUser>,
) -> ApiResult<impl IntoResponse> {
    user.require(ADMIN_MANAGE)?;
    dto.check()?;

    let password_hash = checked_hash(&state, &dto.password)?;
    let row = UserRepository::new(state.pool.clone())
        .create(NewUser {
            email: dto.email,
            display_name: dto.display_name,
            password_hash,
            role: dto.role,
        })
        .await?;

    tracing::info!(user_id = row.id, created_by = user.id, "User created");
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/admin/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(dto): ApiJson<UpdateUser>,
) -> ApiResult<impl IntoResponse> {
    user.require(ADMIN_MANAGE)?;
    dto.check()?;

    if id == user.id && dto.active == Some(false) {
        return Err(ApiError::conflict("You cannot deactivate your own account"));
    }

    let password_hash = match dto.password.as_deref() {
        Some(password) => Some(checked_hash(&state, password)?),
        None => None,
    };

    let row = UserRepository::new(state.pool.clone())
        .update(
            id,
            UserChanges {
                display_name: dto.display_name,
                password_hash,
                role: dto.role,
                active: dto.active,
            },
        )
        .await?;

    Ok(Json(row))
}

/// DELETE /api/admin/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    user.require(ADMIN_MANAGE)?;

    if id == user.id {
        return Err(ApiError::conflict("You cannot delete your own account"));
    }

    UserRepository::new(state.pool.clone()).delete(id).await?;
    tracing::info!(user_id = id, deleted_by = user.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
