//! Member repository
//!
//! Members are referenced by e-mail from tags, relations, tasks and inscriptions.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use crm_core::{Entity, PaginationParams, RecordId};
use crm_models::{normalize_email, CreateMember, UpdateMember};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repository::{
    blank_to_none, like_pattern, not_found, PaginatedResult, Repository, RepositoryError,
    RepositoryResult,
};

/// Member row from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRow {
    pub id: RecordId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub status_code: Option<String>,
    pub joined_on: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemberRow {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Entity for MemberRow {
    const TABLE_NAME: &'static str = "members";
    const TYPE_NAME: &'static str = "Member";
}

/// Query-string filters for the member list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberFilter {
    /// Matches e-mail, first name or last name
    pub search: Option<String>,
    /// Member status code
    pub status: Option<String>,
}

const COLUMNS: &str =
    "id, email, first_name, last_name, phone, status_code, joined_on, notes, created_at, updated_at";

const FILTER: &str = r#"
    ($1::TEXT IS NULL OR email ILIKE $1 OR first_name ILIKE $1 OR last_name ILIKE $1)
    AND ($2::TEXT IS NULL OR status_code = $2)
"#;

/// Member repository
#[derive(Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Filtered page of members ordered by name
    pub async fn list(
        &self,
        filter: &MemberFilter,
        params: &PaginationParams,
    ) -> RepositoryResult<PaginatedResult<MemberRow>> {
        let search = filter
            .search
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(like_pattern);
        let status = blank_to_none(filter.status.clone());

        let items = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {} FROM members WHERE {} ORDER BY last_name ASC, first_name ASC LIMIT $3 OFFSET $4",
            COLUMNS, FILTER
        ))
        .bind(&search)
        .bind(&status)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM members WHERE {}", FILTER))
            .bind(&search)
            .bind(&status)
            .fetch_one(&self.pool)
            .await?;

        Ok(PaginatedResult::new(items, total))
    }

    pub async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<MemberRow>> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {} FROM members WHERE email = $1",
            COLUMNS
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn is_email_unique(&self, email: &str, exclude_id: Option<RecordId>) -> RepositoryResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM members WHERE email = $1 AND ($2::UUID IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(!taken)
    }
}

#[async_trait]
impl Repository<MemberRow, CreateMember, UpdateMember> for MemberRepository {
    async fn find_by_id(&self, id: RecordId) -> RepositoryResult<Option<MemberRow>> {
        let row = sqlx::query_as::<_, MemberRow>(&format!("SELECT {} FROM members WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<MemberRow>> {
        let rows = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {} FROM members ORDER BY last_name ASC, first_name ASC LIMIT $1 OFFSET $2",
            COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateMember) -> RepositoryResult<MemberRow> {
        let email = normalize_email(&dto.email);
        if !self.is_email_unique(&email, None).await? {
            return Err(RepositoryError::Conflict(
                "Email has already been taken".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, MemberRow>(&format!(
            r#"
            INSERT INTO members (id, email, first_name, last_name, phone, status_code, joined_on, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(dto.first_name.trim())
        .bind(dto.last_name.trim())
        .bind(blank_to_none(dto.phone))
        .bind(blank_to_none(dto.status_code))
        .bind(dto.joined_on)
        .bind(blank_to_none(dto.notes))
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(member_id = %row.id, "Member created");
        Ok(row)
    }

    async fn update(&self, id: RecordId, dto: UpdateMember) -> RepositoryResult<MemberRow> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<MemberRow>(id))?;

        let email = dto
            .email
            .map(|e| normalize_email(&e))
            .unwrap_or(existing.email);
        if !self.is_email_unique(&email, Some(id)).await? {
            return Err(RepositoryError::Conflict(
                "Email has already been taken".to_string(),
            ));
        }

        let first_name = dto.first_name.map(|n| n.trim().to_string()).unwrap_or(existing.first_name);
        let last_name = dto.last_name.map(|n| n.trim().to_string()).unwrap_or(existing.last_name);
        let phone = dto.phone.map_or(existing.phone, |p| blank_to_none(Some(p)));
        let status_code = dto
            .status_code
            .map_or(existing.status_code, |s| blank_to_none(Some(s)));
        let joined_on = dto.joined_on.or(existing.joined_on);
        let notes = dto.notes.map_or(existing.notes, |n| blank_to_none(Some(n)));

        let row = sqlx::query_as::<_, MemberRow>(&format!(
            r#"
            UPDATE members
            SET email = $2, first_name = $3, last_name = $4, phone = $5, status_code = $6,
                joined_on = $7, notes = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(&email)
        .bind(&first_name)
        .bind(&last_name)
        .bind(&phone)
        .bind(&status_code)
        .bind(joined_on)
        .bind(&notes)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: RecordId) -> RepositoryResult<()> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<MemberRow>(id))?;

        let open_loans = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM loans WHERE borrower_email = $1 AND returned_at IS NULL",
        )
        .bind(&existing.email)
        .fetch_one(&self.pool)
        .await?;

        if open_loans > 0 {
            return Err(RepositoryError::Conflict(format!(
                "Cannot delete member with {} open loans",
                open_loans
            )));
        }

        sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn exists(&self, id: RecordId) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM members WHERE id = $1)")
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
    fn test_filter_from_query_string() {
        let filter: MemberFilter =
            serde_json::from_str(r#"{"search":"dup","status":"active"}"#).unwrap();
        assert_eq!(filter.search.as_deref(), Some("dup"));
        assert_eq!(filter.status.as_deref(), Some("active"));

        let empty: MemberFilter = serde_json::from_str("{}").unwrap();
        assert!(empty.search.is_none());
    }

    #[test]
    fn test_full_name() {
        let row = MemberRow {
            id: Uuid::new_v4(),
            email: "claire@example.org".into(),
            first_name: "Claire".into(),
            last_name: "Martin".into(),
            phone: None,
            status_code: Some("active".into()),
            joined_on: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(row.full_name(), "Claire Martin");
    }
}
