//! Tool directory handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crm_auth::builtin::{TOOLS_READ, TOOLS_WRITE};
use crm_core::RecordId;
use crm_db::{Repository, ToolCategoryRepository, ToolFilter, ToolRepository};
use crm_models::{CheckInput, CreateTool, CreateToolCategory, UpdateTool, UpdateToolCategory};

use super::page;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser, Pagination};

/// GET /api/tools/categories
pub async fn list_categories(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
) -> ApiResult<impl IntoResponse> {
    user.require(TOOLS_READ)?;

    let result = ToolCategoryRepository::new(state.pool.clone())
        .paginate(&pagination)
        .await?;
    Ok(page(result, &pagination))
}

/// GET /api/tools/categories/:id
pub async fn get_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(TOOLS_READ)?;

    let row = ToolCategoryRepository::new(state.pool.clone()).get(id).await?;
    Ok(Json(row))
}

/// POST /api/tools/categories
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(dto): ApiJson<CreateToolCategory>,
) -> ApiResult<impl IntoResponse> {
    user.require(TOOLS_WRITE)?;
    dto.check()?;

    let row = ToolCategoryRepository::new(state.pool.clone()).create(dto).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/tools/categories/:id
pub async fn update_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(dto): ApiJson<UpdateToolCategory>,
) -> ApiResult<impl IntoResponse> {
    user.require(TOOLS_WRITE)?;
    dto.check()?;

    let row = ToolCategoryRepository::new(state.pool.clone()).update(id, dto).await?;
    Ok(Json(row))
}

/// DELETE /api/tools/categories/:id
pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(TOOLS_WRITE)?;

    ToolCategoryRepository::new(state.pool.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/tools?categoryId=&active=
pub async fn list_tools(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
    ApiQuery(filter): ApiQuery<ToolFilter>,
) -> ApiResult<impl IntoResponse> {
    user.require(TOOLS_READ)?;

    let result = ToolRepository::new(state.pool.clone())
        .list(&filter, &pagination)
        .await?;
    Ok(page(result, &pagination))
}

/// GET /api/tools/:id
pub async fn get_tool(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(TOOLS_READ)?;

    let row = ToolRepository::new(state.pool.clone()).get(id).await?;
    Ok(Json(row))
}

/// POST /api/tools
pub async fn create_tool(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(dto): ApiJson<CreateTool>,
) -> ApiResult<impl IntoResponse> {
    user.require(TOOLS_WRITE)?;
    dto.check()?;

    let row = ToolRepository::new(state.pool.clone()).create(dto).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/tools/:id
pub async fn update_tool(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(dto): ApiJson<UpdateTool>,
) -> ApiResult<impl IntoResponse> {
    user.require(TOOLS_WRITE)?;
    dto.check()?;

    let row = ToolRepository::new(state.pool.clone()).update(id, dto).await?;
    Ok(Json(row))
}

/// DELETE /api/tools/:id
pub async fn delete_tool(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(TOOLS_WRITE)?;

    ToolRepository::new(state.pool.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
