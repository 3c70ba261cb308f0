//! Development request handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crm_auth::builtin::{DEV_REQUESTS_READ, DEV_REQUESTS_WRITE};
use crm_core::RecordId;
use crm_db::{DevRequestFilter, DevRequestRepository, Repository};
use crm_models::{CheckInput, CreateDevRequest, UpdateDevRequest};

use super::page;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser, Pagination};

/// GET /api/dev-requests?status=&priority=
pub async fn list_dev_requests(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
    ApiQuery(filter): ApiQuery<DevRequestFilter>,
) -> ApiResult<impl IntoResponse> {
    user.require(DEV_REQUESTS_READ)?;

    let result = DevRequestRepository::new(state.pool.clone())
        .list(&filter, &pagination)
        .await?;
    Ok(page(result, &pagination))
}

/// GET /api/dev-requests/:id
pub async fn get_dev_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(DEV_REQUESTS_READ)?;

    let row = DevRequestRepository::new(state.pool.clone()).get(id).await?;
    Ok(Json(row))
}

/// POST /api/dev-requests
pub async fn create_dev_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(dto): ApiJson<CreateDevRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require(DEV_REQUESTS_WRITE)?;
    dto.check()?;

    let row = DevRequestRepository::new(state.pool.clone()).create(dto).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/dev-requests/:id
pub async fn update_dev_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(dto): ApiJson<UpdateDevRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require(DEV_REQUESTS_WRITE)?;
    dto.check()?;

    let row = DevRequestRepository::new(state.pool.clone()).update(id, dto).await?;
    Ok(Json(row))
}

/// DELETE /api/dev-requests/:id
pub async fn delete_dev_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(DEV_REQUESTS_WRITE)?;

    DevRequestRepository::new(state.pool.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
