//! Member status handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crm_auth::builtin::{MEMBERS_READ, MEMBERS_WRITE};
use crm_core::RecordId;
use crm_db::{MemberStatusRepository, Repository};
use crm_models::{CheckInput, CreateMemberStatus, UpdateMemberStatus};

use super::page;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, AppState, AuthenticatedUser, Pagination};

/// GET /api/member-statuses
pub async fn list_member_statuses(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_READ)?;

    let result = MemberStatusRepository::new(state.pool.clone())
        .paginate(&pagination)
        .await?;
    Ok(page(result, &pagination))
}

/// GET /api/member-statuses/:id
pub async fn get_member_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_READ)?;

    let row = MemberStatusRepository::new(state.pool.clone()).get(id).await?;
    Ok(Json(row))
}

/// POST /api/member-statuses
pub async fn create_member_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(dto): ApiJson<CreateMemberStatus>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;
    dto.check()?;

    let row = MemberStatusRepository::new(state.pool.clone()).create(dto).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/member-statuses/:id
pub async fn update_member_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(dto): ApiJson<UpdateMemberStatus>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;
    dto.check()?;

    let row = MemberStatusRepository::new(state.pool.clone()).update(id, dto).await?;
    Ok(Json(row))
}

/// DELETE /api/member-statuses/:id
pub async fn delete_member_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;

    MemberStatusRepository::new(state.pool.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
