//! Tracking repository: metric samples, threshold alerts and the dashboard

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_core::{Entity, PaginationParams, RecordId};
use crm_models::tracking::builtin;
use crm_models::{AlertSeverity, Comparator, CreateAlert, RecordMetric, UpdateAlert};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::repository::{
    blank_to_none, not_found, parse_column, PaginatedResult, Repository, RepositoryResult,
};

/// Metric sample row from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRow {
    pub id: RecordId,
    pub key: String,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

impl Entity for MetricRow {
    const TABLE_NAME: &'static str = "tracking_metrics";
    const TYPE_NAME: &'static str = "Metric";
}

/// Alert row from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRow {
    pub id: RecordId,
    pub name: String,
    pub metric_key: String,
    pub comparator: String,
    pub threshold: f64,
    pub severity: String,
    pub active: bool,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlertRow {
    pub fn comparator(&self) -> RepositoryResult<Comparator> {
        parse_column(&self.comparator)
    }

    pub fn severity(&self) -> RepositoryResult<AlertSeverity> {
        parse_column(&self.severity)
    }
}

impl Entity for AlertRow {
    const TABLE_NAME: &'static str = "tracking_alerts";
    const TYPE_NAME: &'static str = "Alert";
}

/// An active alert whose condition holds for the latest metric value
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggeredAlert {
    pub alert: AlertRow,
    pub value: f64,
}

/// Latest value of every metric plus the alerts currently triggered
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub metrics: Vec<MetricRow>,
    pub triggered_alerts: Vec<TriggeredAlert>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricFilter {
    pub key: Option<String>,
}

const METRIC_COLUMNS: &str = "id, key, value, recorded_at";

const ALERT_COLUMNS: &str = "id, name, metric_key, comparator, threshold, severity, active, last_triggered_at, created_at, updated_at";

/// Active alerts whose condition holds, most severe first
pub fn triggered_alerts(alerts: Vec<AlertRow>, latest: &HashMap<String, f64>) -> Vec<TriggeredAlert> {
    let mut triggered: Vec<TriggeredAlert> = alerts
        .into_iter()
        .filter(|alert| alert.active)
        .filter_map(|alert| {
            let value = *latest.get(&alert.metric_key)?;
            let comparator = alert.comparator().ok()?;
            comparator
                .holds(value, alert.threshold)
                .then_some(TriggeredAlert { alert, value })
        })
        .collect();

    triggered.sort_by(|a, b| {
        let a = a.alert.severity().unwrap_or_default();
        let b = b.alert.severity().unwrap_or_default();
        b.cmp(&a)
    });
    triggered
}

/// Metric sample repository
#[derive(Clone)]
pub struct MetricRepository {
    pool: PgPool,
}

impl MetricRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Samples, newest first
    pub async fn list(
        &self,
        filter: &MetricFilter,
        params: &PaginationParams,
    ) -> RepositoryResult<PaginatedResult<MetricRow>> {
        let key = blank_to_none(filter.key.clone());

        let items = sqlx::query_as::<_, MetricRow>(&format!(
            r#"
            SELECT {} FROM tracking_metrics
            WHERE ($1::TEXT IS NULL OR key = $1)
            ORDER BY recorded_at DESC
            LIMIT $2 OFFSET $3
            "#,
            METRIC_COLUMNS
        ))
        .bind(&key)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tracking_metrics WHERE ($1::TEXT IS NULL OR key = $1)",
        )
        .bind(&key)
        .fetch_one(&self.pool)
        .await?;

        Ok(PaginatedResult::new(items, total))
    }

    pub async fn record(&self, dto: RecordMetric) -> RepositoryResult<MetricRow> {
        let row = sqlx::query_as::<_, MetricRow>(&format!(
            r#"
            INSERT INTO tracking_metrics (id, key, value, recorded_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            METRIC_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(dto.key.trim())
        .bind(dto.value)
        .bind(dto.recorded_at.unwrap_or_else(Utc::now))
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Record every built-in metric at the same instant
    pub async fn snapshot(&self) -> RepositoryResult<Vec<MetricRow>> {
        let counts = sqlx::query_as::<_, (i64, i64, i64, i64, i64, i64, i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM members),
                (SELECT COUNT(*) FROM events WHERE status = 'published' AND starts_at >= NOW()),
                (SELECT COUNT(*) FROM inscriptions WHERE status = 'registered'),
                (SELECT COUNT(*) FROM loans WHERE returned_at IS NULL),
                (SELECT COUNT(*) FROM loans WHERE returned_at IS NULL AND due_at < NOW()),
                (SELECT COUNT(*) FROM ideas WHERE status IN ('new', 'under_review')),
                (SELECT COUNT(*) FROM member_tasks WHERE status IN ('todo', 'in_progress')),
                (SELECT COUNT(*) FROM development_requests WHERE status IN ('open', 'in_progress'))
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let values = [
            (builtin::MEMBERS_TOTAL, counts.0),
            (builtin::EVENTS_UPCOMING, counts.1),
            (builtin::INSCRIPTIONS_REGISTERED, counts.2),
            (builtin::LOANS_OPEN, counts.3),
            (builtin::LOANS_OVERDUE, counts.4),
            (builtin::IDEAS_PENDING, counts.5),
            (builtin::TASKS_OPEN, counts.6),
            (builtin::DEV_REQUESTS_OPEN, counts.7),
        ];

        let recorded_at = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut rows = Vec::with_capacity(values.len());
        for (key, value) in values {
            let row = sqlx::query_as::<_, MetricRow>(&format!(
                "INSERT INTO tracking_metrics (id, key, value, recorded_at) VALUES ($1, $2, $3, $4) RETURNING {}",
                METRIC_COLUMNS
            ))
            .bind(Uuid::new_v4())
            .bind(key)
            .bind(value as f64)
            .bind(recorded_at)
            .fetch_one(&mut *tx)
            .await?;
            rows.push(row);
        }
        tx.commit().await?;

        tracing::info!(metrics = rows.len(), "Tracking snapshot recorded");
        Ok(rows)
    }

    /// Most recent sample of every key
    pub async fn latest(&self) -> RepositoryResult<Vec<MetricRow>> {
        let rows = sqlx::query_as::<_, MetricRow>(&format!(
            r#"
            SELECT DISTINCT ON (key) {}
            FROM tracking_metrics
            ORDER BY key ASC, recorded_at DESC
            "#,
            METRIC_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// Alert repository
#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
    metrics: MetricRepository,
}

impl AlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            metrics: MetricRepository::new(pool.clone()),
            pool,
        }
    }

    async fn active_alerts(&self) -> RepositoryResult<Vec<AlertRow>> {
        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            "SELECT {} FROM tracking_alerts WHERE active ORDER BY name ASC",
            ALERT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn compute_triggered(&self) -> RepositoryResult<(Vec<MetricRow>, Vec<TriggeredAlert>)> {
        let latest = self.metrics.latest().await?;
        let values: HashMap<String, f64> = latest.iter().map(|m| (m.key.clone(), m.value)).collect();
        let triggered = triggered_alerts(self.active_alerts().await?, &values);
        Ok((latest, triggered))
    }

    /// Compare every active alert with the latest metric value and stamp the triggered ones
    pub async fn evaluate(&self) -> RepositoryResult<Vec<TriggeredAlert>> {
        let (_, mut triggered) = self.compute_triggered().await?;
        if triggered.is_empty() {
            return Ok(triggered);
        }

        let ids: Vec<Uuid> = triggered.iter().map(|t| t.alert.id).collect();
        let stamped_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            UPDATE tracking_alerts SET last_triggered_at = NOW()
            WHERE id = ANY($1)
            RETURNING last_triggered_at
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .next();

        for t in &mut triggered {
            t.alert.last_triggered_at = stamped_at.or(t.alert.last_triggered_at);
            tracing::warn!(
                alert = %t.alert.name,
                metric = %t.alert.metric_key,
                value = t.value,
                threshold = t.alert.threshold,
                "Alert triggered"
            );
        }
        Ok(triggered)
    }

    /// Snapshot view; does not stamp alerts
    pub async fn dashboard(&self) -> RepositoryResult<Dashboard> {
        let (metrics, triggered_alerts) = self.compute_triggered().await?;
        Ok(Dashboard {
            metrics,
            triggered_alerts,
            generated_at: Utc::now(),
        })
    }
}

#[async_trait]
impl Repository<AlertRow, CreateAlert, UpdateAlert> for AlertRepository {
    async fn find_by_id(&self, id: RecordId) -> RepositoryResult<Option<AlertRow>> {
        let row = sqlx::query_as::<_, AlertRow>(&format!(
            "SELECT {} FROM tracking_alerts WHERE id = $1",
            ALERT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<AlertRow>> {
        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            "SELECT {} FROM tracking_alerts ORDER BY name ASC LIMIT $1 OFFSET $2",
            ALERT_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tracking_alerts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateAlert) -> RepositoryResult<AlertRow> {
        let row = sqlx::query_as::<_, AlertRow>(&format!(
            r#"
            INSERT INTO tracking_alerts (id, name, metric_key, comparator, threshold, severity, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING {}
            "#,
            ALERT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(dto.name.trim())
        .bind(dto.metric_key.trim())
        .bind(dto.comparator.as_str())
        .bind(dto.threshold)
        .bind(dto.severity.as_str())
        .bind(dto.active)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, id: RecordId, dto: UpdateAlert) -> RepositoryResult<AlertRow> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<AlertRow>(id))?;

        let name = dto.name.map(|n| n.trim().to_string()).unwrap_or(existing.name);
        let metric_key = dto
            .metric_key
            .map(|k| k.trim().to_string())
            .unwrap_or(existing.metric_key);
        let comparator = dto
            .comparator
            .map(|c| c.as_str().to_string())
            .unwrap_or(existing.comparator);
        let threshold = dto.threshold.unwrap_or(existing.threshold);
        let severity = dto
            .severity
            .map(|s| s.as_str().to_string())
            .unwrap_or(existing.severity);
        let active = dto.active.unwrap_or(existing.active);

        let row = sqlx::query_as::<_, AlertRow>(&format!(
            r#"
            UPDATE tracking_alerts
            SET name = $2, metric_key = $3, comparator = $4, threshold = $5, severity = $6,
                active = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ALERT_COLUMNS
        ))
        .bind(id)
        .bind(&name)
        .bind(&metric_key)
        .bind(&comparator)
        .bind(threshold)
        .bind(&severity)
        .bind(active)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: RecordId) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM tracking_alerts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found::<AlertRow>(id));
        }
        Ok(())
    }

    async fn exists(&self, id: RecordId) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM tracking_alerts WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(name: &str, key: &str, comparator: &str, threshold: f64, severity: &str, active: bool) -> AlertRow {
        AlertRow {
            id: Uuid::new_v4(),
            name: name.into(),
            metric_key: key.into(),
            comparator: comparator.into(),
            threshold,
            severity: severity.into(),
            active,
            last_triggered_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn latest() -> HashMap<String, f64> {
        HashMap::from([
            (builtin::LOANS_OVERDUE.to_string(), 4.0),
            (builtin::MEMBERS_TOTAL.to_string(), 120.0),
        ])
    }

    #[test]
    fn test_triggered_alerts_compare_latest_value() {
        let alerts = vec![
            alert("Retards", builtin::LOANS_OVERDUE, "gte", 3.0, "warning", true),
            alert("Peu de membres", builtin::MEMBERS_TOTAL, "lt", 50.0, "info", true),
        ];

        let triggered = triggered_alerts(alerts, &latest());
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].alert.name, "Retards");
        assert_eq!(triggered[0].value, 4.0);
    }

    #[test]
    fn test_inactive_and_unknown_metrics_are_skipped() {
        let alerts = vec![
            alert("Off", builtin::LOANS_OVERDUE, "gt", 0.0, "critical", false),
            alert("No data", builtin::IDEAS_PENDING, "gt", 0.0, "critical", true),
        ];
        assert!(triggered_alerts(alerts, &latest()).is_empty());
    }

    #[test]
    fn test_triggered_alerts_most_severe_first() {
        let alerts = vec![
            alert("a", builtin::MEMBERS_TOTAL, "gt", 10.0, "info", true),
            alert("b", builtin::MEMBERS_TOTAL, "gt", 10.0, "critical", true),
            alert("c", builtin::LOANS_OVERDUE, "gt", 1.0, "warning", true),
        ];

        let names: Vec<_> = triggered_alerts(alerts, &latest())
            .into_iter()
            .map(|t| t.alert.name)
            .collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }

    fn sample(key: &str, value: f64, age_minutes: i64) -> RecordMetric {
        RecordMetric {
            key: key.into(),
            value,
            recorded_at: Some(Utc::now() - chrono::Duration::minutes(age_minutes)),
        }
    }

    fn create_alert(name: &str, comparator: Comparator, threshold: f64, active: bool) -> CreateAlert {
        CreateAlert {
            name: name.into(),
            metric_key: builtin::LOANS_OVERDUE.into(),
            comparator,
            threshold,
            severity: AlertSeverity::Warning,
            active,
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_evaluate_uses_latest_sample_and_stamps(pool: PgPool) {
        let metrics = MetricRepository::new(pool.clone());
        metrics.record(sample(builtin::LOANS_OVERDUE, 1.0, 60)).await.unwrap();
        metrics.record(sample(builtin::LOANS_OVERDUE, 5.0, 0)).await.unwrap();

        let alerts = AlertRepository::new(pool);
        let fired = alerts
            .create(create_alert("Retards", Comparator::Gte, 3.0, true))
            .await
            .unwrap();
        let quiet = alerts
            .create(create_alert("Retards critiques", Comparator::Gt, 10.0, true))
            .await
            .unwrap();
        alerts
            .create(create_alert("Désactivée", Comparator::Gt, 0.0, false))
            .await
            .unwrap();

        let triggered = alerts.evaluate().await.unwrap();
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].alert.id, fired.id);
        assert_eq!(triggered[0].value, 5.0);
        assert!(triggered[0].alert.last_triggered_at.is_some());

        assert!(alerts.get(fired.id).await.unwrap().last_triggered_at.is_some());
        assert!(alerts.get(quiet.id).await.unwrap().last_triggered_at.is_none());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_dashboard_does_not_stamp(pool: PgPool) {
        MetricRepository::new(pool.clone())
            .record(sample(builtin::LOANS_OVERDUE, 4.0, 0))
            .await
            .unwrap();
        let alerts = AlertRepository::new(pool);
        let alert = alerts
            .create(create_alert("Retards", Comparator::Gt, 1.0, true))
            .await
            .unwrap();

        let dashboard = alerts.dashboard().await.unwrap();
        assert_eq!(dashboard.metrics.len(), 1);
        assert_eq!(dashboard.triggered_alerts.len(), 1);
        assert!(alerts.get(alert.id).await.unwrap().last_triggered_at.is_none());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_snapshot_records_every_builtin_metric(pool: PgPool) {
        let metrics = MetricRepository::new(pool);
        let rows = metrics.snapshot().await.unwrap();

        let keys: Vec<_> = rows.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, builtin::ALL);
        assert!(rows.iter().all(|m| m.value == 0.0));
        assert!(rows.iter().all(|m| m.recorded_at == rows[0].recorded_at));

        let page = metrics
            .list(&MetricFilter::default(), &PaginationParams::new(3, 50))
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 8);
    }
}
