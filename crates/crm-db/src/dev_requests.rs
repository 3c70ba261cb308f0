//! Development request repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_core::{Entity, PaginationParams, RecordId};
use crm_models::{
    normalize_email, CreateDevRequest, DevRequestPriority, DevRequestStatus, UpdateDevRequest,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repository::{blank_to_none, not_found, PaginatedResult, Repository, RepositoryResult};

/// Development request row from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevRequestRow {
    pub id: RecordId,
    pub title: String,
    pub description: Option<String>,
    pub requester_email: String,
    pub priority: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for DevRequestRow {
    const TABLE_NAME: &'static str = "development_requests";
    const TYPE_NAME: &'static str = "Development request";
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevRequestFilter {
    pub status: Option<DevRequestStatus>,
    pub priority: Option<DevRequestPriority>,
}

const COLUMNS: &str =
    "id, title, description, requester_email, priority, status, created_at, updated_at";

const FILTER: &str = "($1::TEXT IS NULL OR status = $1) AND ($2::TEXT IS NULL OR priority = $2)";

/// Highest priority first
const ORDER: &str = r#"
    CASE priority WHEN 'critical' THEN 0 WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END,
    created_at ASC
"#;

/// Development request repository
#[derive(Clone)]
pub struct DevRequestRepository {
    pool: PgPool,
}

impl DevRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        filter: &DevRequestFilter,
        params: &PaginationParams,
    ) -> RepositoryResult<PaginatedResult<DevRequestRow>> {
        let status = filter.status.map(|s| s.as_str());
        let priority = filter.priority.map(|p| p.as_str());

        let items = sqlx::query_as::<_, DevRequestRow>(&format!(
            "SELECT {} FROM development_requests WHERE {} ORDER BY {} LIMIT $3 OFFSET $4",
            COLUMNS, FILTER, ORDER
        ))
        .bind(status)
        .bind(priority)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM development_requests WHERE {}",
            FILTER
        ))
        .bind(status)
        .bind(priority)
        .fetch_one(&self.pool)
        .await?;

        Ok(PaginatedResult::new(items, total))
    }
}

#[async_trait]
impl Repository<DevRequestRow, CreateDevRequest, UpdateDevRequest> for DevRequestRepository {
    async fn find_by_id(&self, id: RecordId) -> RepositoryResult<Option<DevRequestRow>> {
        let row = sqlx::query_as::<_, DevRequestRow>(&format!(
            "SELECT {} FROM development_requests WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<DevRequestRow>> {
        let rows = sqlx::query_as::<_, DevRequestRow>(&format!(
            "SELECT {} FROM development_requests ORDER BY {} LIMIT $1 OFFSET $2",
            COLUMNS, ORDER
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM development_requests")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateDevRequest) -> RepositoryResult<DevRequestRow> {
        let row = sqlx::query_as::<_, DevRequestRow>(&format!(
            r#"
            INSERT INTO development_requests (id, title, description, requester_email, priority, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(dto.title.trim())
        .bind(blank_to_none(dto.description))
        .bind(normalize_email(&dto.requester_email))
        .bind(dto.priority.as_str())
        .bind(DevRequestStatus::default().as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, id: RecordId, dto: UpdateDevRequest) -> RepositoryResult<DevRequestRow> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<DevRequestRow>(id))?;

        let title = dto.title.map(|t| t.trim().to_string()).unwrap_or(existing.title);
        let description = dto
            .description
            .map_or(existing.description, |d| blank_to_none(Some(d)));
        let priority = dto
            .priority
            .map(|p| p.as_str().to_string())
            .unwrap_or(existing.priority);
        let status = dto
            .status
            .map(|s| s.as_str().to_string())
            .unwrap_or(existing.status);

        let row = sqlx::query_as::<_, DevRequestRow>(&format!(
            r#"
            UPDATE development_requests
            SET title = $2, description = $3, priority = $4, status = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(&title)
        .bind(&description)
        .bind(&priority)
        .bind(&status)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: RecordId) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM development_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found::<DevRequestRow>(id));
        }
        Ok(())
    }

    async fn exists(&self, id: RecordId) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM development_requests WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
