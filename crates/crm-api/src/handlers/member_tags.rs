//! Member tag handlers and tag assignment

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crm_auth::builtin::{MEMBERS_READ, MEMBERS_WRITE};
use crm_core::RecordId;
use crm_db::{MemberTagRepository, Repository};
use crm_models::{AssignTag, CheckInput, CreateMemberTag, UpdateMemberTag};

use super::page;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, AppState, AuthenticatedUser, Pagination};

/// GET /api/member-tags
pub async fn list_member_tags(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_READ)?;

    let result = MemberTagRepository::new(state.pool.clone())
        .paginate(&pagination)
        .await?;
    Ok(page(result, &pagination))
}

/// GET /api/member-tags/:id
pub async fn get_member_tag(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_READ)?;

    let row = MemberTagRepository::new(state.pool.clone()).get(id).await?;
    Ok(Json(row))
}

/// POST /api/member-tags
pub async fn create_member_tag(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(dto): ApiJson<CreateMemberTag>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;
    dto.check()?;

    let row = MemberTagRepository::new(state.pool.clone()).create(dto).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/member-tags/:id
pub async fn update_member_tag(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(dto): ApiJson<UpdateMemberTag>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;
    dto.check()?;

    let row = MemberTagRepository::new(state.pool.clone()).update(id, dto).await?;
    Ok(Json(row))
}

/// DELETE /api/member-tags/:id
pub async fn delete_member_tag(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;

    MemberTagRepository::new(state.pool.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/members/:id/tags
pub async fn list_tags_of_member(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(member_id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_READ)?;

    let tags = MemberTagRepository::new(state.pool.clone())
        .find_by_member(member_id)
        .await?;
    Ok(Json(tags))
}

/// POST /api/members/:id/tags
pub async fn assign_tag(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(member_id): ApiPath<RecordId>,
    ApiJson(dto): ApiJson<AssignTag>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;

    let tag = MemberTagRepository::new(state.pool.clone())
        .assign(member_id, dto.tag_id)
        .await?;
    Ok(Json(tag))
}

/// DELETE /api/members/:id/tags/:tag_id
pub async fn unassign_tag(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath((member_id, tag_id)): ApiPath<(RecordId, RecordId)>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;

    MemberTagRepository::new(state.pool.clone())
        .unassign(member_id, tag_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
