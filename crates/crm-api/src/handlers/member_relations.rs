//! Member relation handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crm_auth::builtin::{MEMBERS_READ, MEMBERS_WRITE};
use crm_core::RecordId;
use crm_db::{MemberRelationRepository, RelationFilter, Repository};
use crm_models::{CheckInput, CreateMemberRelation, UpdateMemberRelation};

use super::page;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser, Pagination};

/// GET /api/member-relations?memberEmail=
pub async fn list_member_relations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
    ApiQuery(filter): ApiQuery<RelationFilter>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_READ)?;

    let result = MemberRelationRepository::new(state.pool.clone())
        .list(&filter, &pagination)
        .await?;
    Ok(page(result, &pagination))
}

/// GET /api/member-relations/:id
pub async fn get_member_relation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_READ)?;

    let row = MemberRelationRepository::new(state.pool.clone()).get(id).await?;
    Ok(Json(row))
}

/// POST /api/member-relations
pub async fn create_member_relation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(dto): ApiJson<CreateMemberRelation>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;
    dto.check()?;

    let row = MemberRelationRepository::new(state.pool.clone()).create(dto).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/member-relations/:id
pub async fn update_member_relation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(dto): ApiJson<UpdateMemberRelation>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;
    dto.check()?;

    let row = MemberRelationRepository::new(state.pool.clone()).update(id, dto).await?;
    Ok(Json(row))
}

/// DELETE /api/member-relations/:id
pub async fn delete_member_relation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(MEMBERS_WRITE)?;

    MemberRelationRepository::new(state.pool.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
