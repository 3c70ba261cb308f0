//! Member handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crm_auth::builtin::{MEMBERS_READ, MEMBERS_WRITE};
use crm_core::RecordId;
use crm_db::{MemberFilter, MemberRepository, Repository};
use crm_models::{CheckInput, CreateMember, UpdateMember};

use super::page;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser, Pagination};

/// GET /api/members?search=&status=
pub async fn list_members(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
    ApiQuery(filter): ApiQuery<MemberFilter>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_READ)?;

    let result = MemberRepository::new(state.pool.clone())
        .list(&filter, &pagination)
        .await?;
    Ok(page(result, &pagination))
}

/// GET /api/members/:id
pub async fn get_member(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_READ)?;

    let row = MemberRepository::new(state.pool.clone()).get(id).await?;
    Ok(Json(row))
}

/// POST /api/members
pub async fn create_member(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(dto): ApiJson<CreateMember>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;
    dto.check()?;

    let row = MemberRepository::new(state.pool.clone()).create(dto).await?;
    tracing::info!(member_id = %row.id, "Member created");
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/members/:id
pub async fn update_member(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(dto): ApiJson<UpdateMember>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;
    dto.check()?;

    let row = MemberRepository::new(state.pool.clone()).update(id, dto).await?;
    Ok(Json(row))
}

/// DELETE /api/members/:id
pub async fn delete_member(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;

    MemberRepository::new(state.pool.clone()).delete(id).await?;
    tracing::info!(member_id = %id, "Member deleted");
    Ok(StatusCode::NO_CONTENT)
}
