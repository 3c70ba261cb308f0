//! Idea repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_core::{Entity, PaginationParams, RecordId};
use crm_models::{normalize_email, CreateIdea, IdeaStatus, UpdateIdea};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repository::{blank_to_none, not_found, PaginatedResult, Repository, RepositoryResult};

/// Idea row from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaRow {
    pub id: RecordId,
    pub title: String,
    pub description: Option<String>,
    pub author_email: String,
    pub status: String,
    pub votes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for IdeaRow {
    const TABLE_NAME: &'static str = "ideas";
    const TYPE_NAME: &'static str = "Idea";
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdeaFilter {
    pub status: Option<IdeaStatus>,
}

const COLUMNS: &str = "id, title, description, author_email, status, votes, created_at, updated_at";

/// Idea repository
#[derive(Clone)]
pub struct IdeaRepository {
    pool: PgPool,
}

impl IdeaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Most voted first
    pub async fn list(
        &self,
        filter: &IdeaFilter,
        params: &PaginationParams,
    ) -> RepositoryResult<PaginatedResult<IdeaRow>> {
        let status = filter.status.map(|s| s.as_str());

        let items = sqlx::query_as::<_, IdeaRow>(&format!(
            r#"
            SELECT {} FROM ideas
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY votes DESC, created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            COLUMNS
        ))
        .bind(status)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM ideas WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(PaginatedResult::new(items, total))
    }

    /// Add one vote
    pub async fn vote(&self, id: RecordId) -> RepositoryResult<IdeaRow> {
        sqlx::query_as::<_, IdeaRow>(&format!(
            r#"
            UPDATE ideas SET votes = votes + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found::<IdeaRow>(id))
    }
}

#[async_trait]
impl Repository<IdeaRow, CreateIdea, UpdateIdea> for IdeaRepository {
    async fn find_by_id(&self, id: RecordId) -> RepositoryResult<Option<IdeaRow>> {
        let row = sqlx::query_as::<_, IdeaRow>(&format!("SELECT {} FROM ideas WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<IdeaRow>> {
        let rows = sqlx::query_as::<_, IdeaRow>(&format!(
            "SELECT {} FROM ideas ORDER BY votes DESC, created_at DESC LIMIT $1 OFFSET $2",
            COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ideas")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateIdea) -> RepositoryResult<IdeaRow> {
        let row = sqlx::query_as::<_, IdeaRow>(&format!(
            r#"
            INSERT INTO ideas (id, title, description, author_email, status, votes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 0, NOW(), NOW())
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(dto.title.trim())
        .bind(blank_to_none(dto.description))
        .bind(normalize_email(&dto.author_email))
        .bind(IdeaStatus::default().as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, id: RecordId, dto: UpdateIdea) -> RepositoryResult<IdeaRow> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<IdeaRow>(id))?;

        let title = dto.title.map(|t| t.trim().to_string()).unwrap_or(existing.title);
        let description = dto
            .description
            .map_or(existing.description, |d| blank_to_none(Some(d)));
        let status = dto
            .status
            .map(|s| s.as_str().to_string())
            .unwrap_or(existing.status);

        let row = sqlx::query_as::<_, IdeaRow>(&format!(
            r#"
            UPDATE ideas
            SET title = $2, description = $3, status = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(&title)
        .bind(&description)
        .bind(&status)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: RecordId) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM ideas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found::<IdeaRow>(id));
        }
        Ok(())
    }

    async fn exists(&self, id: RecordId) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM ideas WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}
