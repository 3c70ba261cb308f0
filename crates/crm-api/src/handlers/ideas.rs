//! Idea box handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crm_auth::builtin::{IDEAS_READ, IDEAS_WRITE};
use crm_core::RecordId;
use crm_db::{IdeaFilter, IdeaRepository, Repository};
use crm_models::{CheckInput, CreateIdea, UpdateIdea};

use super::page;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser, Pagination};

/// GET /api/ideas?status=
pub async fn list_ideas(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
    ApiQuery(filter): ApiQuery<IdeaFilter>,
) -> ApiResult<impl IntoResponse> {
    user.require(IDEAS_READ)?;

    let result = IdeaRepository::new(state.pool.clone())
        .list(&filter, &pagination)
        .await?;
    Ok(page(result, &pagination))
}

/// GET /api/ideas/:id
pub async fn get_idea(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(IDEAS_READ)?;

    let row = IdeaRepository::new(state.pool.clone()).get(id).await?;
    Ok(Json(row))
}

/// POST /api/ideas
pub async fn create_idea(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(dto): ApiJson<CreateIdea>,
) -> ApiResult<impl IntoResponse> {
    user.require(IDEAS_WRITE)?;
    dto.check()?;

    let row = IdeaRepository::new(state.pool.clone()).create(dto).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/ideas/:id
pub async fn update_idea(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(dto): ApiJson<UpdateIdea>,
) -> ApiResult<impl IntoResponse> {
    user.require(IDEAS_WRITE)?;
    dto.check()?;

    let row = IdeaRepository::new(state.pool.clone()).update(id, dto).await?;
    Ok(Json(row))
}

/// DELETE /api/ideas/:id
pub async fn delete_idea(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(IDEAS_WRITE)?;

    IdeaRepository::new(state.pool.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/ideas/:id/vote
pub async fn vote_idea(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(IDEAS_WRITE)?;

    let row = IdeaRepository::new(state.pool.clone()).vote(id).await?;
    Ok(Json(row))
}
