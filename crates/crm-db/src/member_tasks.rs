//! Member task repository

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use crm_core::{Entity, PaginationParams, RecordId};
use crm_models::{normalize_email, CreateMemberTask, TaskStatus, UpdateMemberTask};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repository::{
    blank_to_none, not_found, parse_column, PaginatedResult, Repository, RepositoryError,
    RepositoryResult,
};

/// Member task row from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberTaskRow {
    pub id: RecordId,
    pub member_email: String,
    pub title: String,
    pub description: Option<String>,
    pub due_on: Option<NaiveDate>,
    pub status: String,
    pub assigned_to: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemberTaskRow {
    pub fn status(&self) -> Result<TaskStatus, RepositoryError> {
        parse_column(&self.status)
    }
}

impl Entity for MemberTaskRow {
    const TABLE_NAME: &'static str = "member_tasks";
    const TYPE_NAME: &'static str = "Member task";
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub member_email: Option<String>,
    pub status: Option<TaskStatus>,
}

const COLUMNS: &str = "id, member_email, title, description, due_on, status, assigned_to, completed_at, created_at, updated_at";

const FILTER: &str = "($1::TEXT IS NULL OR member_email = $1) AND ($2::TEXT IS NULL OR status = $2)";

/// Member task repository
#[derive(Clone)]
pub struct MemberTaskRepository {
    pool: PgPool,
}

impl MemberTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Filtered page of tasks; open tasks with the nearest due date first
    pub async fn list(
        &self,
        filter: &TaskFilter,
        params: &PaginationParams,
    ) -> RepositoryResult<PaginatedResult<MemberTaskRow>> {
        let email = blank_to_none(filter.member_email.clone()).map(|e| normalize_email(&e));
        let status = filter.status.map(|s| s.as_str());

        let items = sqlx::query_as::<_, MemberTaskRow>(&format!(
            r#"
            SELECT {} FROM member_tasks
            WHERE {}
            ORDER BY due_on ASC NULLS LAST, created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            COLUMNS, FILTER
        ))
        .bind(&email)
        .bind(status)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM member_tasks WHERE {}", FILTER))
            .bind(&email)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        Ok(PaginatedResult::new(items, total))
    }
}

#[async_trait]
impl Repository<MemberTaskRow, CreateMemberTask, UpdateMemberTask> for MemberTaskRepository {
    async fn find_by_id(&self, id: RecordId) -> RepositoryResult<Option<MemberTaskRow>> {
        let row = sqlx::query_as::<_, MemberTaskRow>(&format!(
            "SELECT {} FROM member_tasks WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<MemberTaskRow>> {
        let rows = sqlx::query_as::<_, MemberTaskRow>(&format!(
            "SELECT {} FROM member_tasks ORDER BY due_on ASC NULLS LAST, created_at DESC LIMIT $1 OFFSET $2",
            COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM member_tasks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateMemberTask) -> RepositoryResult<MemberTaskRow> {
        let completed_at = dto.status.completed_at(None, Utc::now());

        let row = sqlx::query_as::<_, MemberTaskRow>(&format!(
            r#"
            INSERT INTO member_tasks
                (id, member_email, title, description, due_on, status, assigned_to, completed_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(normalize_email(&dto.member_email))
        .bind(dto.title.trim())
        .bind(blank_to_none(dto.description))
        .bind(dto.due_on)
        .bind(dto.status.as_str())
        .bind(blank_to_none(dto.assigned_to).map(|e| normalize_email(&e)))
        .bind(completed_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, id: RecordId, dto: UpdateMemberTask) -> RepositoryResult<MemberTaskRow> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<MemberTaskRow>(id))?;

        let status = match dto.status {
            Some(status) => status,
            None => existing.status()?,
        };
        let completed_at = status.completed_at(existing.completed_at, Utc::now());

        let title = dto.title.map(|t| t.trim().to_string()).unwrap_or(existing.title);
        let description = dto
            .description
            .map_or(existing.description, |d| blank_to_none(Some(d)));
        let due_on = dto.due_on.or(existing.due_on);
        let assigned_to = dto
            .assigned_to
            .map_or(existing.assigned_to, |a| blank_to_none(Some(a)).map(|e| normalize_email(&e)));

        let row = sqlx::query_as::<_, MemberTaskRow>(&format!(
            r#"
            UPDATE member_tasks
            SET title = $2, description = $3, due_on = $4, status = $5, assigned_to = $6,
                completed_at = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(&title)
        .bind(&description)
        .bind(due_on)
        .bind(status.as_str())
        .bind(&assigned_to)
        .bind(completed_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: RecordId) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM member_tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found::<MemberTaskRow>(id));
        }
        Ok(())
    }

    async fn exists(&self, id: RecordId) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM member_tasks WHERE id = $1)")
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
    fn test_filter_parses_status() {
        let filter: TaskFilter =
            serde_json::from_str(r#"{"memberEmail":"ana@example.org","status":"in_progress"}"#).unwrap();
        assert_eq!(filter.status, Some(TaskStatus::InProgress));

        assert!(serde_json::from_str::<TaskFilter>(r#"{"status":"later"}"#).is_err());
    }
}
