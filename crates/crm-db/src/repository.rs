//! Repository traits and base implementations
//!
//! Provides generic CRUD operations for database entities.

use async_trait::async_trait;
use crm_core::{CrmError, Entity, PaginationParams, ValidationErrors};
use uuid::Uuid;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    Invalid(ValidationErrors),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return RepositoryError::Conflict(unique_message(db_err.constraint()));
            }
            if db_err.is_foreign_key_violation() {
                return RepositoryError::Validation(format!(
                    "Referenced record does not exist ({})",
                    db_err.constraint().unwrap_or("foreign key")
                ));
            }
            if db_err.is_check_violation() {
                return RepositoryError::Validation(format!(
                    "Value violates constraint {}",
                    db_err.constraint().unwrap_or("check")
                ));
            }
        }
        RepositoryError::Database(err)
    }
}

impl From<ValidationErrors> for RepositoryError {
    fn from(errors: ValidationErrors) -> Self {
        RepositoryError::Invalid(errors)
    }
}

impl From<RepositoryError> for CrmError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(value) => CrmError::NotFound {
                entity: "record",
                field: "id",
                value,
            },
            RepositoryError::Database(e) => CrmError::Database(e.to_string()),
            RepositoryError::Validation(message) => {
                let mut errors = ValidationErrors::new();
                errors.add_base(message);
                CrmError::Validation(errors)
            }
            RepositoryError::Invalid(errors) => CrmError::Validation(errors),
            RepositoryError::Conflict(message) => CrmError::Conflict { message },
        }
    }
}

fn unique_message(constraint: Option<&str>) -> String {
    match constraint {
        Some(name) if name.contains("email") => "Email has already been taken".to_string(),
        Some(name) if name.contains("code") => "Code has already been taken".to_string(),
        Some(name) if name.contains("name") => "Name has already been taken".to_string(),
        Some(name) => format!("Record already exists ({})", name),
        None => "Record already exists".to_string(),
    }
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Base repository trait for CRUD operations
///
/// Domain records are keyed by UUID; user accounts override `K` with `i64`.
#[async_trait]
pub trait Repository<T, CreateDto, UpdateDto, K = Uuid>: Send + Sync
where
    T: Send + 'static,
    K: Send + Sync + 'static,
    CreateDto: Send + 'static,
    UpdateDto: Send + 'static,
{
    /// Find an entity by ID
    async fn find_by_id(&self, id: K) -> RepositoryResult<Option<T>>;

    /// Find all entities with pagination
    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<T>>;

    /// Count all entities
    async fn count(&self) -> RepositoryResult<i64>;

    /// Create a new entity
    async fn create(&self, dto: CreateDto) -> RepositoryResult<T>;

    /// Update an existing entity
    async fn update(&self, id: K, dto: UpdateDto) -> RepositoryResult<T>;

    /// Delete an entity by ID
    async fn delete(&self, id: K) -> RepositoryResult<()>;

    /// Check if an entity exists
    async fn exists(&self, id: K) -> RepositoryResult<bool>;

    /// Find by ID, turning a miss into `NotFound`
    async fn get(&self, id: K) -> RepositoryResult<T>
    where
        K: std::fmt::Display + Copy,
        T: Entity,
    {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<T>(id))
    }

    /// One page of entities plus the total count
    async fn paginate(&self, params: &PaginationParams) -> RepositoryResult<PaginatedResult<T>> {
        let items = self.find_all(params.limit(), params.offset()).await?;
        let total = self.count().await?;
        Ok(PaginatedResult::new(items, total))
    }
}

/// Query result with its total count
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total: i64) -> Self {
        Self { items, total }
    }
}

/// `NotFound` error naming the entity type
pub fn not_found<T: Entity>(id: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::NotFound(format!("{} {} not found", T::TYPE_NAME, id))
}

/// Parse a `TEXT` enum column
pub(crate) fn parse_column<E>(value: &str) -> RepositoryResult<E>
where
    E: std::str::FromStr<Err = crm_models::ParseEnumError>,
{
    value
        .parse()
        .map_err(|e: crm_models::ParseEnumError| RepositoryError::Validation(e.to_string()))
}

/// Trim text and treat an empty string as "no value"
pub(crate) fn blank_to_none(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern
pub(crate) fn like_pattern(search: &str) -> String {
    let escaped = search
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_to_none() {
        assert_eq!(blank_to_none(Some("  ".into())), None);
        assert_eq!(blank_to_none(Some(" x ".into())), Some("x".into()));
        assert_eq!(blank_to_none(None), None);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("dupont"), "%dupont%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_unique_messages() {
        assert_eq!(unique_message(Some("members_email_key")), "Email has already been taken");
        assert_eq!(unique_message(Some("loan_items_code_key")), "Code has already been taken");
        assert_eq!(unique_message(None), "Record already exists");
    }

    #[test]
    fn test_into_crm_error() {
        let err: CrmError = RepositoryError::Conflict("taken".into()).into();
        assert_eq!(err.status_code(), 409);

        let err: CrmError = RepositoryError::Validation("bad".into()).into();
        assert_eq!(err.status_code(), 422);

        let err: CrmError = RepositoryError::NotFound("42".into()).into();
        assert_eq!(err.status_code(), 404);
    }
}
