//! User repository
//!
//! Database operations for back-office accounts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_core::{Entity, Id};
use crm_models::{normalize_email, Role};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::repository::{not_found, Repository, RepositoryError, RepositoryResult};

/// User database entity
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: Id,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Parsed role; unknown values fall back to the least privileged role
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or_default()
    }
}

impl Entity for UserRow {
    const TABLE_NAME: &'static str = "users";
    const TYPE_NAME: &'static str = "User";
}

/// DTO for creating a user; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: Role,
}

/// DTO for updating a user
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub display_name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

const COLUMNS: &str =
    "id, email, display_name, password_hash, role, active, last_login_at, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by e-mail (case-insensitive)
    pub async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            COLUMNS
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Stamp a successful login
    pub async fn update_last_login(&self, id: Id) -> RepositoryResult<()> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Repository<UserRow, NewUser, UserChanges, Id> for UserRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<UserRow>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY email ASC LIMIT $1 OFFSET $2",
            COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: NewUser) -> RepositoryResult<UserRow> {
        let email = normalize_email(&dto.email);
        if self.find_by_email(&email).await?.is_some() {
            return Err(RepositoryError::Conflict(
                "Email has already been taken".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, display_name, password_hash, role, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, NOW(), NOW())
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(&email)
        .bind(dto.display_name.trim())
        .bind(&dto.password_hash)
        .bind(dto.role.as_str())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = row.id, role = %row.role, "User created");
        Ok(row)
    }

    async fn update(&self, id: Id, dto: UserChanges) -> RepositoryResult<UserRow> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<UserRow>(id))?;

        let display_name = dto
            .display_name
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.display_name);
        let password_hash = dto.password_hash.unwrap_or(existing.password_hash);
        let role = dto
            .role
            .map(|r| r.as_str().to_string())
            .unwrap_or(existing.role);
        let active = dto.active.unwrap_or(existing.active);

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET display_name = $2, password_hash = $3, role = $4, active = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(&display_name)
        .bind(&password_hash)
        .bind(&role)
        .bind(active)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found::<UserRow>(id));
        }
        Ok(())
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str) -> UserRow {
        UserRow {
            id: 1,
            email: "ana@example.org".into(),
            display_name: "Ana".into(),
            password_hash: "$argon2id$v=19$...".into(),
            role: role.into(),
            active: true,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let json = serde_json::to_value(row("admin")).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["displayName"], "Ana");
    }

    #[test]
    fn test_unknown_role_falls_back_to_viewer() {
        assert_eq!(row("manager").role(), Role::Manager);
        assert_eq!(row("root").role(), Role::Viewer);
    }
}
