//! Member status repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_core::{Entity, RecordId};
use crm_models::{CreateMemberStatus, UpdateMemberStatus};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repository::{blank_to_none, not_found, Repository, RepositoryError, RepositoryResult};

/// Member status row from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStatusRow {
    pub id: RecordId,
    pub code: String,
    pub label: String,
    pub color: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for MemberStatusRow {
    const TABLE_NAME: &'static str = "member_statuses";
    const TYPE_NAME: &'static str = "Member status";
}

const COLUMNS: &str = "id, code, label, color, position, created_at, updated_at";

/// Member status repository
#[derive(Clone)]
pub struct MemberStatusRepository {
    pool: PgPool,
}

impl MemberStatusRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_code(&self, code: &str) -> RepositoryResult<Option<MemberStatusRow>> {
        let row = sqlx::query_as::<_, MemberStatusRow>(&format!(
            "SELECT {} FROM member_statuses WHERE code = $1",
            COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

#[async_trait]
impl Repository<MemberStatusRow, CreateMemberStatus, UpdateMemberStatus> for MemberStatusRepository {
    async fn find_by_id(&self, id: RecordId) -> RepositoryResult<Option<MemberStatusRow>> {
        let row = sqlx::query_as::<_, MemberStatusRow>(&format!(
            "SELECT {} FROM member_statuses WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<MemberStatusRow>> {
        let rows = sqlx::query_as::<_, MemberStatusRow>(&format!(
            "SELECT {} FROM member_statuses ORDER BY position ASC, label ASC LIMIT $1 OFFSET $2",
            COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM member_statuses")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateMemberStatus) -> RepositoryResult<MemberStatusRow> {
        if self.find_by_code(&dto.code).await?.is_some() {
            return Err(RepositoryError::Conflict(
                "Code has already been taken".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, MemberStatusRow>(&format!(
            r#"
            INSERT INTO member_statuses (id, code, label, color, position, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&dto.code)
        .bind(dto.label.trim())
        .bind(blank_to_none(dto.color))
        .bind(dto.position)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, id: RecordId, dto: UpdateMemberStatus) -> RepositoryResult<MemberStatusRow> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<MemberStatusRow>(id))?;

        let label = dto.label.map(|l| l.trim().to_string()).unwrap_or(existing.label);
        let color = match dto.color {
            Some(color) => blank_to_none(Some(color)),
            None => existing.color,
        };
        let position = dto.position.unwrap_or(existing.position);

        let row = sqlx::query_as::<_, MemberStatusRow>(&format!(
            r#"
            UPDATE member_statuses
            SET label = $2, color = $3, position = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(&label)
        .bind(&color)
        .bind(position)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: RecordId) -> RepositoryResult<()> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<MemberStatusRow>(id))?;

        // Members keep a reference to the code
        let in_use = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members WHERE status_code = $1")
            .bind(&existing.code)
            .fetch_one(&self.pool)
            .await?;

        if in_use > 0 {
            return Err(RepositoryError::Conflict(format!(
                "Cannot delete status '{}' used by {} members",
                existing.code, in_use
            )));
        }

        sqlx::query("DELETE FROM member_statuses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn exists(&self, id: RecordId) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM member_statuses WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
