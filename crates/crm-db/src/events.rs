//! Event repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_core::{Entity, PaginationParams, RecordId};
use crm_models::event::check_schedule;
use crm_models::{CreateEvent, EventStatus, UpdateEvent};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repository::{
    blank_to_none, not_found, parse_column, PaginatedResult, Repository, RepositoryError,
    RepositoryResult,
};

/// Event row from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRow {
    pub id: RecordId,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: Option<i32>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRow {
    pub fn status(&self) -> RepositoryResult<EventStatus> {
        parse_column(&self.status)
    }
}

impl Entity for EventRow {
    const TABLE_NAME: &'static str = "events";
    const TYPE_NAME: &'static str = "Event";
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    /// Only events that have not started yet
    pub upcoming: Option<bool>,
}

pub(crate) const COLUMNS: &str =
    "id, title, description, location, starts_at, ends_at, capacity, status, created_at, updated_at";

const FILTER: &str = "($1::TEXT IS NULL OR status = $1) AND (NOT $2 OR starts_at >= NOW())";

/// Event repository
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Filtered page of events; upcoming lists run soonest first
    pub async fn list(
        &self,
        filter: &EventFilter,
        params: &PaginationParams,
    ) -> RepositoryResult<PaginatedResult<EventRow>> {
        let status = filter.status.map(|s| s.as_str());
        let upcoming = filter.upcoming.unwrap_or(false);
        let order = if upcoming { "starts_at ASC" } else { "starts_at DESC" };

        let items = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events WHERE {} ORDER BY {} LIMIT $3 OFFSET $4",
            COLUMNS, FILTER, order
        ))
        .bind(status)
        .bind(upcoming)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM events WHERE {}", FILTER))
            .bind(status)
            .bind(upcoming)
            .fetch_one(&self.pool)
            .await?;

        Ok(PaginatedResult::new(items, total))
    }
}

#[async_trait]
impl Repository<EventRow, CreateEvent, UpdateEvent> for EventRepository {
    async fn find_by_id(&self, id: RecordId) -> RepositoryResult<Option<EventRow>> {
        let row = sqlx::query_as::<_, EventRow>(&format!("SELECT {} FROM events WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events ORDER BY starts_at DESC LIMIT $1 OFFSET $2",
            COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateEvent) -> RepositoryResult<EventRow> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events (id, title, description, location, starts_at, ends_at, capacity, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(dto.title.trim())
        .bind(blank_to_none(dto.description))
        .bind(blank_to_none(dto.location))
        .bind(dto.starts_at)
        .bind(dto.ends_at)
        .bind(dto.capacity)
        .bind(dto.status.as_str())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(event_id = %row.id, "Event created");
        Ok(row)
    }

    async fn update(&self, id: RecordId, dto: UpdateEvent) -> RepositoryResult<EventRow> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<EventRow>(id))?;

        let starts_at = dto.starts_at.unwrap_or(existing.starts_at);
        let ends_at = dto.ends_at.unwrap_or(existing.ends_at);
        check_schedule(starts_at, ends_at).map_err(|e| {
            RepositoryError::Validation(e.message.map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()))
        })?;

        let title = dto.title.map(|t| t.trim().to_string()).unwrap_or(existing.title);
        let description = dto
            .description
            .map_or(existing.description, |d| blank_to_none(Some(d)));
        let location = dto.location.map_or(existing.location, |l| blank_to_none(Some(l)));
        let capacity = dto.capacity.or(existing.capacity);
        let status = dto
            .status
            .map(|s| s.as_str().to_string())
            .unwrap_or(existing.status);

        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            UPDATE events
            SET title = $2, description = $3, location = $4, starts_at = $5, ends_at = $6,
                capacity = $7, status = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(&title)
        .bind(&description)
        .bind(&location)
        .bind(starts_at)
        .bind(ends_at)
        .bind(capacity)
        .bind(&status)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: RecordId) -> RepositoryResult<()> {
        // Inscriptions cascade
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found::<EventRow>(id));
        }
        Ok(())
    }

    async fn exists(&self, id: RecordId) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults() {
        let filter: EventFilter = serde_json::from_str("{}").unwrap();
        assert!(filter.status.is_none());
        assert_eq!(filter.upcoming, None);

        let filter: EventFilter = serde_json::from_str(r#"{"status":"published","upcoming":true}"#).unwrap();
        assert_eq!(filter.status, Some(EventStatus::Published));
        assert_eq!(filter.upcoming, Some(true));
    }
}
