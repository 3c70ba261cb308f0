//! Tool catalog repositories

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_core::{Entity, PaginationParams, RecordId};
use crm_models::{CreateTool, CreateToolCategory, UpdateTool, UpdateToolCategory};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repository::{
    blank_to_none, not_found, PaginatedResult, Repository, RepositoryError, RepositoryResult,
};

/// Tool category row from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCategoryRow {
    pub id: RecordId,
    pub name: String,
    pub description: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for ToolCategoryRow {
    const TABLE_NAME: &'static str = "tool_categories";
    const TYPE_NAME: &'static str = "Tool category";
}

/// Tool row from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRow {
    pub id: RecordId,
    pub category_id: RecordId,
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for ToolRow {
    const TABLE_NAME: &'static str = "tools";
    const TYPE_NAME: &'static str = "Tool";
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolFilter {
    pub category_id: Option<Uuid>,
    pub active: Option<bool>,
}

const CATEGORY_COLUMNS: &str = "id, name, description, position, created_at, updated_at";

const TOOL_COLUMNS: &str = "id, category_id, name, url, description, active, created_at, updated_at";

const TOOL_FILTER: &str = "($1::UUID IS NULL OR category_id = $1) AND ($2::BOOLEAN IS NULL OR active = $2)";

/// Tool category repository
#[derive(Clone)]
pub struct ToolCategoryRepository {
    pool: PgPool,
}

impl ToolCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn is_name_unique(&self, name: &str, exclude_id: Option<RecordId>) -> RepositoryResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM tool_categories WHERE name = $1 AND ($2::UUID IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(!taken)
    }
}

#[async_trait]
impl Repository<ToolCategoryRow, CreateToolCategory, UpdateToolCategory> for ToolCategoryRepository {
    async fn find_by_id(&self, id: RecordId) -> RepositoryResult<Option<ToolCategoryRow>> {
        let row = sqlx::query_as::<_, ToolCategoryRow>(&format!(
            "SELECT {} FROM tool_categories WHERE id = $1",
            CATEGORY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<ToolCategoryRow>> {
        let rows = sqlx::query_as::<_, ToolCategoryRow>(&format!(
            "SELECT {} FROM tool_categories ORDER BY position ASC, name ASC LIMIT $1 OFFSET $2",
            CATEGORY_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tool_categories")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateToolCategory) -> RepositoryResult<ToolCategoryRow> {
        let name = dto.name.trim().to_string();
        if !self.is_name_unique(&name, None).await? {
            return Err(RepositoryError::Conflict(
                "Name has already been taken".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, ToolCategoryRow>(&format!(
            r#"
            INSERT INTO tool_categories (id, name, description, position, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(blank_to_none(dto.description))
        .bind(dto.position)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, id: RecordId, dto: UpdateToolCategory) -> RepositoryResult<ToolCategoryRow> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<ToolCategoryRow>(id))?;

        let name = dto.name.map(|n| n.trim().to_string()).unwrap_or(existing.name);
        if !self.is_name_unique(&name, Some(id)).await? {
            return Err(RepositoryError::Conflict(
                "Name has already been taken".to_string(),
            ));
        }
        let description = dto
            .description
            .map_or(existing.description, |d| blank_to_none(Some(d)));
        let position = dto.position.unwrap_or(existing.position);

        let row = sqlx::query_as::<_, ToolCategoryRow>(&format!(
            r#"
            UPDATE tool_categories
            SET name = $2, description = $3, position = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        ))
        .bind(id)
        .bind(&name)
        .bind(&description)
        .bind(position)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: RecordId) -> RepositoryResult<()> {
        if !self.exists(id).await? {
            return Err(not_found::<ToolCategoryRow>(id));
        }

        let tool_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tools WHERE category_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        if tool_count > 0 {
            return Err(RepositoryError::Conflict(format!(
                "Cannot delete category with {} tools",
                tool_count
            )));
        }

        sqlx::query("DELETE FROM tool_categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn exists(&self, id: RecordId) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM tool_categories WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

/// Tool repository
#[derive(Clone)]
pub struct ToolRepository {
    pool: PgPool,
}

impl ToolRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        filter: &ToolFilter,
        params: &PaginationParams,
    ) -> RepositoryResult<PaginatedResult<ToolRow>> {
        let items = sqlx::query_as::<_, ToolRow>(&format!(
            "SELECT {} FROM tools WHERE {} ORDER BY name ASC LIMIT $3 OFFSET $4",
            TOOL_COLUMNS, TOOL_FILTER
        ))
        .bind(filter.category_id)
        .bind(filter.active)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM tools WHERE {}", TOOL_FILTER))
            .bind(filter.category_id)
            .bind(filter.active)
            .fetch_one(&self.pool)
            .await?;

        Ok(PaginatedResult::new(items, total))
    }

    async fn ensure_category(&self, category_id: RecordId) -> RepositoryResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM tool_categories WHERE id = $1)",
        )
        .bind(category_id)
        .fetch_one(&self.pool)
        .await?;

        if !exists {
            return Err(RepositoryError::Validation(format!(
                "Tool category {} does not exist",
                category_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository<ToolRow, CreateTool, UpdateTool> for ToolRepository {
    async fn find_by_id(&self, id: RecordId) -> RepositoryResult<Option<ToolRow>> {
        let row = sqlx::query_as::<_, ToolRow>(&format!("SELECT {} FROM tools WHERE id = $1", TOOL_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<ToolRow>> {
        let rows = sqlx::query_as::<_, ToolRow>(&format!(
            "SELECT {} FROM tools ORDER BY name ASC LIMIT $1 OFFSET $2",
            TOOL_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tools")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateTool) -> RepositoryResult<ToolRow> {
        self.ensure_category(dto.category_id).await?;

        let row = sqlx::query_as::<_, ToolRow>(&format!(
            r#"
            INSERT INTO tools (id, category_id, name, url, description, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING {}
            "#,
            TOOL_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(dto.category_id)
        .bind(dto.name.trim())
        .bind(dto.url.trim())
        .bind(blank_to_none(dto.description))
        .bind(dto.active)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, id: RecordId, dto: UpdateTool) -> RepositoryResult<ToolRow> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<ToolRow>(id))?;

        let category_id = dto.category_id.unwrap_or(existing.category_id);
        if category_id != existing.category_id {
            self.ensure_category(category_id).await?;
        }
        let name = dto.name.map(|n| n.trim().to_string()).unwrap_or(existing.name);
        let url = dto.url.map(|u| u.trim().to_string()).unwrap_or(existing.url);
        let description = dto
            .description
            .map_or(existing.description, |d| blank_to_none(Some(d)));
        let active = dto.active.unwrap_or(existing.active);

        let row = sqlx::query_as::<_, ToolRow>(&format!(
            r#"
            UPDATE tools
            SET category_id = $2, name = $3, url = $4, description = $5, active = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TOOL_COLUMNS
        ))
        .bind(id)
        .bind(category_id)
        .bind(&name)
        .bind(&url)
        .bind(&description)
        .bind(active)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: RecordId) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM tools WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found::<ToolRow>(id));
        }
        Ok(())
    }

    async fn exists(&self, id: RecordId) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM tools WHERE id = $1)")
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
    fn test_tool_filter_parses_category() {
        let id = Uuid::new_v4();
        let filter: ToolFilter =
            serde_json::from_str(&format!(r#"{{"categoryId":"{}","active":false}}"#, id)).unwrap();
        assert_eq!(filter.category_id, Some(id));
        assert_eq!(filter.active, Some(false));
    }
}
