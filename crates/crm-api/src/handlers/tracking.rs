//! Metrics, alerts and the tracking dashboard

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use crm_auth::builtin::{TRACKING_READ, TRACKING_WRITE};
use crm_core::RecordId;
use crm_db::{AlertRepository, MetricFilter, MetricRepository, MetricRow, Repository, TriggeredAlert};
use crm_models::{CheckInput, CreateAlert, RecordMetric, UpdateAlert};
use serde::Serialize;

use super::page;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser, Pagination};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotResponse {
    metrics: Vec<MetricRow>,
    triggered_alerts: Vec<TriggeredAlert>,
}

/// GET /api/tracking/metrics?key=
pub async fn list_metrics(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
    ApiQuery(filter): ApiQuery<MetricFilter>,
) -> ApiResult<impl IntoResponse> {
    user.require(TRACKING_READ)?;

    let result = MetricRepository::new(state.pool.clone())
        .list(&filter, &pagination)
        .await?;
    Ok(page(result, &pagination))
}

/// POST /api/tracking/metrics
pub async fn record_metric(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(dto): ApiJson<RecordMetric>,
) -> ApiResult<impl IntoResponse> {
    user.require(TRACKING_WRITE)?;
    dto.check()?;

    let row = MetricRepository::new(state.pool.clone()).record(dto).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// POST /api/tracking/snapshot
///
/// Records the built-in metrics, then evaluates every active alert.
pub async fn snapshot(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    user.require(TRACKING_WRITE)?;

    let metrics = MetricRepository::new(state.pool.clone()).snapshot().await?;
    let triggered_alerts = AlertRepository::new(state.pool.clone()).evaluate().await?;

    tracing::info!(
        metrics = metrics.len(),
        triggered = triggered_alerts.len(),
        "Tracking snapshot taken"
    );
    Ok((
        StatusCode::CREATED,
        Json(SnapshotResponse {
            metrics,
            triggered_alerts,
        }),
    ))
}

/// GET /api/tracking/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    user.require(TRACKING_READ)?;

    let dashboard = AlertRepository::new(state.pool.clone()).dashboard().await?;
    Ok(Json(dashboard))
}

/// GET /api/tracking/alerts
pub async fn list_alerts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
) -> ApiResult<impl IntoResponse> {
    user.require(TRACKING_READ)?;

    let result = AlertRepository::new(state.pool.clone())
        .paginate(&pagination)
        .await?;
    Ok(page(result, &pagination))
}

/// GET /api/tracking/alerts/:id
pub async fn get_alert(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(TRACKING_READ)?;

    let row = AlertRepository::new(state.pool.clone()).get(id).await?;
    Ok(Json(row))
}

/// POST /api/tracking/alerts
pub async fn create_alert(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(dto): ApiJson<CreateAlert>,
) -> ApiResult<impl IntoResponse> {
    user.require(TRACKING_WRITE)?;
    dto.check()?;

    let row = AlertRepository::new(state.pool.clone()).create(dto).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /api/tracking/alerts/:id
pub async fn update_alert(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(dto): ApiJson<UpdateAlert>,
) -> ApiResult<impl IntoResponse> {
    user.require(TRACKING_WRITE)?;
    dto.check()?;

    let row = AlertRepository::new(state.pool.clone()).update(id, dto).await?;
    Ok(Json(row))
}

/// DELETE /api/tracking/alerts/:id
pub async fn delete_alert(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<RecordId>,
) -> ApiResult<impl IntoResponse> {
    user.require(TRACKING_WRITE)?;

    AlertRepository::new(state.pool.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/tracking/alerts/evaluate
pub async fn evaluate_alerts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    user.require(TRACKING_WRITE)?;

    let triggered = AlertRepository::new(state.pool.clone()).evaluate().await?;
    Ok(Json(triggered))
}
