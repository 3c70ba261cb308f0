//! Member task handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crm_auth::builtin::{MEMBERS_READ, MEMBERS_WRITE};
use crm_core::RecordId;
use crm_db::{MemberTaskRepository, Repository, TaskFilter};
use crm_models::{CheckInput, CreateMemberTask, UpdateMemberTask};

use super::page;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser, Pagination};

/// GET /api/member-tasks?memberEmail=&status=
pub async fn list_member_tasks(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
    ApiQuery(filter): ApiQuery<TaskFilter>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_READ)?;

    let result = MemberTaskRepository::new(state.pool.clone())
        .list(&filter, &pagination)
        .await?;
    Ok(page(result, &pagination))
}

/// GET /api/member-tasks/:id
pub async fn get_member_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_READ)?;

    let row = MemberTaskRepository::new(state.pool.clone()).get(id).await?;
    Ok(Json(row))
}

/// POST /api/member-tasks
pub async fn create_member_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(dto): ApiJson<CreateMemberTask>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;
    dto.check()?;

    let row = MemberTaskRepository::new(state.pool.clone()).create(dto).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/member-tasks/:id
pub async fn update_member_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(dto): ApiJson<UpdateMemberTask>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;
    dto.check()?;

    let row = MemberTaskRepository::new(state.pool.clone()).update(id, dto).await?;
    Ok(Json(row))
}

/// DELETE /api/member-tasks/:id
pub async fn delete_member_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;

    MemberTaskRepository::new(state.pool.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
