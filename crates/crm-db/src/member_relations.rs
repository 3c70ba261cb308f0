//! Member relation repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_core::{Entity, PaginationParams, RecordId};
use crm_models::{normalize_email, CreateMemberRelation, UpdateMemberRelation};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repository::{
    blank_to_none, not_found, PaginatedResult, Repository, RepositoryError, RepositoryResult,
};

/// Member relation row from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRelationRow {
    pub id: RecordId,
    pub member_email: String,
    pub related_email: String,
    pub relation_type: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemberRelationRow {
    /// The other side of the relation, seen from `email`
    pub fn counterpart(&self, email: &str) -> &str {
        if self.member_email == email {
            &self.related_email
        } else {
            &self.member_email
        }
    }
}

impl Entity for MemberRelationRow {
    const TABLE_NAME: &'static str = "member_relations";
    const TYPE_NAME: &'static str = "Member relation";
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationFilter {
    /// Relations where this member is on either side
    pub member_email: Option<String>,
}

const COLUMNS: &str = "id, member_email, related_email, relation_type, note, created_at, updated_at";

const FILTER: &str = "($1::TEXT IS NULL OR member_email = $1 OR related_email = $1)";

/// Member relation repository
#[derive(Clone)]
pub struct MemberRelationRepository {
    pool: PgPool,
}

impl MemberRelationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        filter: &RelationFilter,
        params: &PaginationParams,
    ) -> RepositoryResult<PaginatedResult<MemberRelationRow>> {
        let email = blank_to_none(filter.member_email.clone()).map(|e| normalize_email(&e));

        let items = sqlx::query_as::<_, MemberRelationRow>(&format!(
            "SELECT {} FROM member_relations WHERE {} ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            COLUMNS, FILTER
        ))
        .bind(&email)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM member_relations WHERE {}",
            FILTER
        ))
        .bind(&email)
        .fetch_one(&self.pool)
        .await?;

        Ok(PaginatedResult::new(items, total))
    }

    async fn missing_members(&self, emails: &[&str]) -> RepositoryResult<Vec<String>> {
        let mut missing = Vec::new();
        for email in emails {
            let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM members WHERE email = $1)")
                .bind(*email)
                .fetch_one(&self.pool)
                .await?;
            if !exists {
                missing.push(email.to_string());
            }
        }
        Ok(missing)
    }
}

#[async_trait]
impl Repository<MemberRelationRow, CreateMemberRelation, UpdateMemberRelation> for MemberRelationRepository {
    async fn find_by_id(&self, id: RecordId) -> RepositoryResult<Option<MemberRelationRow>> {
        let row = sqlx::query_as::<_, MemberRelationRow>(&format!(
            "SELECT {} FROM member_relations WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<MemberRelationRow>> {
        let rows = sqlx::query_as::<_, MemberRelationRow>(&format!(
            "SELECT {} FROM member_relations ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM member_relations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateMemberRelation) -> RepositoryResult<MemberRelationRow> {
        let member_email = normalize_email(&dto.member_email);
        let related_email = normalize_email(&dto.related_email);

        if member_email == related_email {
            return Err(RepositoryError::Validation(
                "A member cannot be related to themselves".to_string(),
            ));
        }

        let missing = self.missing_members(&[member_email.as_str(), related_email.as_str()]).await?;
        if !missing.is_empty() {
            return Err(RepositoryError::Validation(format!(
                "Unknown member: {}",
                missing.join(", ")
            )));
        }

        let row = sqlx::query_as::<_, MemberRelationRow>(&format!(
            r#"
            INSERT INTO member_relations (id, member_email, related_email, relation_type, note, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&member_email)
        .bind(&related_email)
        .bind(dto.relation_type.as_str())
        .bind(blank_to_none(dto.note))
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, id: RecordId, dto: UpdateMemberRelation) -> RepositoryResult<MemberRelationRow> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<MemberRelationRow>(id))?;

        let relation_type = dto
            .relation_type
            .map(|t| t.as_str().to_string())
            .unwrap_or(existing.relation_type);
        let note = dto.note.map_or(existing.note, |n| blank_to_none(Some(n)));

        let row = sqlx::query_as::<_, MemberRelationRow>(&format!(
            r#"
            UPDATE member_relations
            SET relation_type = $2, note = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(&relation_type)
        .bind(&note)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: RecordId) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM member_relations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found::<MemberRelationRow>(id));
        }
        Ok(())
    }

    async fn exists(&self, id: RecordId) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM member_relations WHERE id = $1)",
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

    #[test]
    fn test_counterpart() {
        let row = MemberRelationRow {
            id: Uuid::new_v4(),
            member_email: "ana@example.org".into(),
            related_email: "leo@example.org".into(),
            relation_type: "family".into(),
            note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(row.counterpart("ana@example.org"), "leo@example.org");
        assert_eq!(row.counterpart("leo@example.org"), "ana@example.org");
    }

    #[test]
    fn test_filter_uses_camel_case() {
        let filter: RelationFilter = serde_json::from_str(r#"{"memberEmail":"ana@example.org"}"#).unwrap();
        assert_eq!(filter.member_email.as_deref(), Some("ana@example.org"));
    }
}
