//! Loan items and loans

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crm_auth::builtin::{LOANS_READ, LOANS_WRITE};
use crm_core::RecordId;
use crm_db::{
    not_found, LoanFilter, LoanItemFilter, LoanItemRepository, LoanRepository, LoanRow, Repository,
};
use crm_models::{CheckInput, CreateLoan, CreateLoanItem, UpdateLoan, UpdateLoanItem};

use super::page;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser, Pagination};

/// GET /api/loans/items?status=
pub async fn list_items(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
    ApiQuery(filter): ApiQuery<LoanItemFilter>,
) -> ApiResult<impl IntoResponse> {
    user.require(LOANS_READ)?;

    let result = LoanItemRepository::new(state.pool.clone())
        .list(&filter, &pagination)
        .await?;
    Ok(page(result, &pagination))
}

/// GET /api/loans/items/:id
pub async fn get_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(LOANS_READ)?;

    let row = LoanItemRepository::new(state.pool.clone()).get(id).await?;
    Ok(Json(row))
}

/// POST /api/loans/items
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(dto): ApiJson<CreateLoanItem>,
) -> ApiResult<impl IntoResponse> {
    user.require(LOANS_WRITE)?;
    dto.check()?;

    let row = LoanItemRepository::new(state.pool.clone()).create(dto).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/loans/items/:id
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(dto): ApiJson<UpdateLoanItem>,
) -> ApiResult<impl IntoResponse> {
    user.require(LOANS_WRITE)?;
    dto.check()?;

    let row = LoanItemRepository::new(state.pool.clone()).update(id, dto).await?;
    Ok(Json(row))
}

/// DELETE /api/loans/items/:id
pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(LOANS_WRITE)?;

    LoanItemRepository::new(state.pool.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/loans?open=&overdue=
pub async fn list_loans(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
    ApiQuery(filter): ApiQuery<LoanFilter>,
) -> ApiResult<impl IntoResponse> {
    user.require(LOANS_READ)?;

    let result = LoanRepository::new(state.pool.clone())
        .list(&filter, &pagination)
        .await?;
    Ok(page(result, &pagination))
}

/// GET /api/loans/:id
pub async fn get_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(LOANS_READ)?;

    let row = LoanRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found::<LoanRow>(id))?;
    Ok(Json(row))
}

/// POST /api/loans
pub async fn lend(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(dto): ApiJson<CreateLoan>,
) -> ApiResult<impl IntoResponse> {
    user.require(LOANS_WRITE)?;
    dto.check()?;

    let row = LoanRepository::new(state.pool.clone()).lend(dto).await?;
    tracing::info!(loan_id = %row.id, item_id = %row.item_id, "Item lent");
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/loans/:id
pub async fn update_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(dto): ApiJson<UpdateLoan>,
) -> ApiResult<impl IntoResponse> {
    user.require(LOANS_WRITE)?;
    dto.check()?;

    let row = LoanRepository::new(state.pool.clone()).update(id, dto).await?;
    Ok(Json(row))
}

/// DELETE /api/loans/:id
pub async fn delete_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(LOANS_WRITE)?;

    LoanRepository::new(state.pool.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/loans/:id/return
pub async fn return_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(LOANS_WRITE)?;

    let row = LoanRepository::new(state.pool.clone()).return_loan(id).await?;
    tracing::info!(loan_id = %row.id, item_id = %row.item_id, "Item returned");
    Ok(Json(row))
}
