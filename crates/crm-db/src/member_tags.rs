//! Member tag repository and tag assignments

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_core::{Entity, RecordId};
use crm_models::{CreateMemberTag, UpdateMemberTag};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::members::MemberRow;
use crate::repository::{blank_to_none, not_found, Repository, RepositoryError, RepositoryResult};

/// Member tag row from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberTagRow {
    pub id: RecordId,
    pub name: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for MemberTagRow {
    const TABLE_NAME: &'static str = "member_tags";
    const TYPE_NAME: &'static str = "Member tag";
}

const COLUMNS: &str = "id, name, color, created_at, updated_at";

/// Member tag repository
#[derive(Clone)]
pub struct MemberTagRepository {
    pool: PgPool,
}

impl MemberTagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check if tag name is unique (case-insensitive)
    async fn is_name_unique(&self, name: &str, exclude_id: Option<RecordId>) -> RepositoryResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM member_tags
                WHERE LOWER(name) = LOWER($1) AND ($2::UUID IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(name)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(!taken)
    }

    async fn member_email(&self, member_id: RecordId) -> RepositoryResult<String> {
        sqlx::query_scalar::<_, String>("SELECT email FROM members WHERE id = $1")
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found::<MemberRow>(member_id))
    }

    /// Tags assigned to a member, by name
    pub async fn find_by_member(&self, member_id: RecordId) -> RepositoryResult<Vec<MemberTagRow>> {
        let email = self.member_email(member_id).await?;

        let rows = sqlx::query_as::<_, MemberTagRow>(
            r#"
            SELECT t.id, t.name, t.color, t.created_at, t.updated_at
            FROM member_tags t
            JOIN member_tag_assignments a ON a.tag_id = t.id
            WHERE a.member_email = $1
            ORDER BY t.name ASC
            "#,
        )
        .bind(&email)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Assign a tag to a member; assigning twice is a no-op
    pub async fn assign(&self, member_id: RecordId, tag_id: RecordId) -> RepositoryResult<MemberTagRow> {
        let email = self.member_email(member_id).await?;
        let tag = self
            .find_by_id(tag_id)
            .await?
            .ok_or_else(|| not_found::<MemberTagRow>(tag_id))?;

        sqlx::query(
            r#"
            INSERT INTO member_tag_assignments (member_email, tag_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (member_email, tag_id) DO NOTHING
            "#,
        )
        .bind(&email)
        .bind(tag_id)
        .execute(&self.pool)
        .await?;

        Ok(tag)
    }

    /// Remove a tag from a member
    pub async fn unassign(&self, member_id: RecordId, tag_id: RecordId) -> RepositoryResult<()> {
        let email = self.member_email(member_id).await?;

        let result = sqlx::query("DELETE FROM member_tag_assignments WHERE member_email = $1 AND tag_id = $2")
            .bind(&email)
            .bind(tag_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!(
                "Tag {} is not assigned to member {}",
                tag_id, member_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository<MemberTagRow, CreateMemberTag, UpdateMemberTag> for MemberTagRepository {
    async fn find_by_id(&self, id: RecordId) -> RepositoryResult<Option<MemberTagRow>> {
        let row = sqlx::query_as::<_, MemberTagRow>(&format!(
            "SELECT {} FROM member_tags WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<MemberTagRow>> {
        let rows = sqlx::query_as::<_, MemberTagRow>(&format!(
            "SELECT {} FROM member_tags ORDER BY name ASC LIMIT $1 OFFSET $2",
            COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM member_tags")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateMemberTag) -> RepositoryResult<MemberTagRow> {
        let name = dto.name.trim().to_string();
        if !self.is_name_unique(&name, None).await? {
            return Err(RepositoryError::Conflict(
                "Name has already been taken".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, MemberTagRow>(&format!(
            r#"
            INSERT INTO member_tags (id, name, color, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(blank_to_none(dto.color))
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, id: RecordId, dto: UpdateMemberTag) -> RepositoryResult<MemberTagRow> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<MemberTagRow>(id))?;

        let name = dto.name.map(|n| n.trim().to_string()).unwrap_or(existing.name);
        let color = dto.color.map_or(existing.color, |c| blank_to_none(Some(c)));

        if !self.is_name_unique(&name, Some(id)).await? {
            return Err(RepositoryError::Conflict(
                "Name has already been taken".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, MemberTagRow>(&format!(
            r#"
            UPDATE member_tags
            SET name = $2, color = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(&name)
        .bind(&color)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: RecordId) -> RepositoryResult<()> {
        // Assignments cascade
        let result = sqlx::query("DELETE FROM member_tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found::<MemberTagRow>(id));
        }
        Ok(())
    }

    async fn exists(&self, id: RecordId) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM member_tags WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}
