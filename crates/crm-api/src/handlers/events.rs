//! Event and inscription handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crm_auth::builtin::{EVENTS_READ, EVENTS_WRITE};
use crm_core::RecordId;
use crm_db::{not_found, EventFilter, EventRepository, InscriptionRepository, InscriptionRow, Repository};
use crm_models::{CheckInput, CreateEvent, CreateInscription, UpdateEvent, UpdateInscription};

use super::page;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser, Pagination};

/// GET /api/events?status=&upcoming=
pub async fn list_events(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
    ApiQuery(filter): ApiQuery<EventFilter>,
) -> ApiResult<impl IntoResponse> {
    user.require(EVENTS_READ)?;

    let result = EventRepository::new(state.pool.clone())
        .list(&filter, &pagination)
        .await?;
    Ok(page(result, &pagination))
}

/// GET /api/events/:id
pub async fn get_event(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(EVENTS_READ)?;

    let row = EventRepository::new(state.pool.clone()).get(id).await?;
    Ok(Json(row))
}

/// POST /api/events
pub async fn create_event(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(dto): ApiJson<CreateEvent>,
) -> ApiResult<impl IntoResponse> {
    user.require(EVENTS_WRITE)?;
    dto.check()?;

    let row = EventRepository::new(state.pool.clone()).create(dto).await?;
    tracing::info!(event_id = %row.id, "Event created");
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/events/:id
pub async fn update_event(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(dto): ApiJson<UpdateEvent>,
) -> ApiResult<impl IntoResponse> {
    user.require(EVENTS_WRITE)?;
    dto.check()?;

    let row = EventRepository::new(state.pool.clone()).update(id, dto).await?;
    Ok(Json(row))
}

/// DELETE /api/events/:id
pub async fn delete_event(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(EVENTS_WRITE)?;

    EventRepository::new(state.pool.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/events/:id/inscriptions
pub async fn list_inscriptions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
    ApiPath(event_id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(EVENTS_READ)?;

    let result = InscriptionRepository::new(state.pool.clone())
        .list_for_event(event_id, &pagination)
        .await?;
    Ok(page(result, &pagination))
}

/// POST /api/events/:id/inscriptions
///
/// Registers the member, or puts them on the waitlist when the event is full.
pub async fn create_inscription(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(event_id): ApiPath<RecordId>,
    ApiJson(dto): ApiJson<CreateInscription>,
) -> ApiResult<impl IntoResponse> {
    user.require(EVENTS_WRITE)?;
    dto.check()?;

    let row = InscriptionRepository::new(state.pool.clone())
        .register(event_id, dto)
        .await?;
    tracing::info!(
        event_id = %event_id,
        inscription_id = %row.id,
        status = %row.status,
        "Inscription recorded"
    );
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/inscriptions/:id
pub async fn get_inscription(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(EVENTS_READ)?;

    let row = InscriptionRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found::<InscriptionRow>(id))?;
    Ok(Json(row))
}

/// PATCH /api/inscriptions/:id
pub async fn update_inscription(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(dto): ApiJson<UpdateInscription>,
) -> ApiResult<impl IntoResponse> {
    user.require(EVENTS_WRITE)?;
    dto.check()?;

    let row = InscriptionRepository::new(state.pool.clone()).update(id, dto).await?;
    Ok(Json(row))
}

/// DELETE /api/inscriptions/:id
pub async fn delete_inscription(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(EVENTS_WRITE)?;

    InscriptionRepository::new(state.pool.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
