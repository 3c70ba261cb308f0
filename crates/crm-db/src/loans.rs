//! Loan item and loan repositories
//!
//! Lending and returning lock the item row; an item is `on_loan` exactly while it
//! has an open loan (`returned_at IS NULL`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_core::{Entity, PaginationParams, RecordId};
use crm_models::loan::is_overdue;
use crm_models::{normalize_email, CreateLoan, CreateLoanItem, LoanItemStatus, UpdateLoan, UpdateLoanItem};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::repository::{
    blank_to_none, not_found, parse_column, PaginatedResult, Repository, RepositoryError,
    RepositoryResult,
};

/// Loan item row from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanItemRow {
    pub id: RecordId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanItemRow {
    pub fn status(&self) -> RepositoryResult<LoanItemStatus> {
        parse_column(&self.status)
    }
}

impl Entity for LoanItemRow {
    const TABLE_NAME: &'static str = "loan_items";
    const TYPE_NAME: &'static str = "Loan item";
}

/// Loan row from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRow {
    pub id: RecordId,
    pub item_id: RecordId,
    pub borrower_email: String,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanRow {
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        is_overdue(self.due_at, self.returned_at, now)
    }
}

impl Entity for LoanRow {
    const TABLE_NAME: &'static str = "loans";
    const TYPE_NAME: &'static str = "Loan";
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoanItemFilter {
    pub status: Option<LoanItemStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoanFilter {
    /// Only loans not returned yet
    pub open: Option<bool>,
    /// Only open loans past their due date
    pub overdue: Option<bool>,
}

const ITEM_COLUMNS: &str = "id, code, name, description, status, created_at, updated_at";

const LOAN_COLUMNS: &str =
    "id, item_id, borrower_email, borrowed_at, due_at, returned_at, note, created_at, updated_at";

const LOAN_FILTER: &str = r#"
    (NOT $1 OR returned_at IS NULL)
    AND (NOT $2 OR (returned_at IS NULL AND due_at < NOW()))
"#;

/// Loan item repository
#[derive(Clone)]
pub struct LoanItemRepository {
    pool: PgPool,
}

impl LoanItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        filter: &LoanItemFilter,
        params: &PaginationParams,
    ) -> RepositoryResult<PaginatedResult<LoanItemRow>> {
        let status = filter.status.map(|s| s.as_str());

        let items = sqlx::query_as::<_, LoanItemRow>(&format!(
            "SELECT {} FROM loan_items WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY code ASC LIMIT $2 OFFSET $3",
            ITEM_COLUMNS
        ))
        .bind(status)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM loan_items WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(PaginatedResult::new(items, total))
    }

    async fn is_code_unique(&self, code: &str) -> RepositoryResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM loan_items WHERE code = $1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;
        Ok(!taken)
    }
}

#[async_trait]
impl Repository<LoanItemRow, CreateLoanItem, UpdateLoanItem> for LoanItemRepository {
    async fn find_by_id(&self, id: RecordId) -> RepositoryResult<Option<LoanItemRow>> {
        let row = sqlx::query_as::<_, LoanItemRow>(&format!(
            "SELECT {} FROM loan_items WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<LoanItemRow>> {
        let rows = sqlx::query_as::<_, LoanItemRow>(&format!(
            "SELECT {} FROM loan_items ORDER BY code ASC LIMIT $1 OFFSET $2",
            ITEM_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM loan_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateLoanItem) -> RepositoryResult<LoanItemRow> {
        let code = dto.code.trim().to_string();
        if !self.is_code_unique(&code).await? {
            return Err(RepositoryError::Conflict(
                "Code has already been taken".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, LoanItemRow>(&format!(
            r#"
            INSERT INTO loan_items (id, code, name, description, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&code)
        .bind(dto.name.trim())
        .bind(blank_to_none(dto.description))
        .bind(LoanItemStatus::Available.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, id: RecordId, dto: UpdateLoanItem) -> RepositoryResult<LoanItemRow> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<LoanItemRow>(id))?;

        let current = existing.status()?;
        let status = match dto.status {
            Some(LoanItemStatus::OnLoan) => {
                return Err(RepositoryError::Validation(
                    "status on_loan is set by lending the item".to_string(),
                ))
            }
            Some(status) if current == LoanItemStatus::OnLoan && status != current => {
                return Err(RepositoryError::Conflict(
                    "Item is on loan; return it first".to_string(),
                ))
            }
            Some(status) => status,
            None => current,
        };
        let name = dto.name.map(|n| n.trim().to_string()).unwrap_or(existing.name);
        let description = dto
            .description
            .map_or(existing.description, |d| blank_to_none(Some(d)));

        let row = sqlx::query_as::<_, LoanItemRow>(&format!(
            r#"
            UPDATE loan_items
            SET name = $2, description = $3, status = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(id)
        .bind(&name)
        .bind(&description)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, id: RecordId) -> RepositoryResult<()> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<LoanItemRow>(id))?;

        if existing.status()? == LoanItemStatus::OnLoan {
            return Err(RepositoryError::Conflict(
                "Cannot delete an item that is on loan".to_string(),
            ));
        }

        let history = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM loans WHERE item_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if history > 0 {
            return Err(RepositoryError::Conflict(format!(
                "Cannot delete an item with {} past loans; retire it instead",
                history
            )));
        }

        sqlx::query("DELETE FROM loan_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn exists(&self, id: RecordId) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM loan_items WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

/// Loan repository
#[derive(Clone)]
pub struct LoanRepository {
    pool: PgPool,
}

impl LoanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: RecordId) -> RepositoryResult<Option<LoanRow>> {
        let row = sqlx::query_as::<_, LoanRow>(&format!("SELECT {} FROM loans WHERE id = $1", LOAN_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn list(
        &self,
        filter: &LoanFilter,
        params: &PaginationParams,
    ) -> RepositoryResult<PaginatedResult<LoanRow>> {
        let open = filter.open.unwrap_or(false);
        let overdue = filter.overdue.unwrap_or(false);

        let items = sqlx::query_as::<_, LoanRow>(&format!(
            "SELECT {} FROM loans WHERE {} ORDER BY borrowed_at DESC LIMIT $3 OFFSET $4",
            LOAN_COLUMNS, LOAN_FILTER
        ))
        .bind(open)
        .bind(overdue)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM loans WHERE {}", LOAN_FILTER))
            .bind(open)
            .bind(overdue)
            .fetch_one(&self.pool)
            .await?;

        Ok(PaginatedResult::new(items, total))
    }

    /// Lend an available item
    pub async fn lend(&self, dto: CreateLoan) -> RepositoryResult<LoanRow> {
        let borrowed_at = dto.borrowed_at_or(Utc::now());
        if dto.due_at <= borrowed_at {
            return Err(RepositoryError::Validation(
                "dueAt must be after borrowedAt".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let item = lock_item(&mut tx, dto.item_id).await?;

        let status = item.status()?;
        if !status.can_be_lent() {
            return Err(RepositoryError::Conflict(format!(
                "Item {} is {} and cannot be lent",
                item.code, status
            )));
        }

        let row = sqlx::query_as::<_, LoanRow>(&format!(
            r#"
            INSERT INTO loans (id, item_id, borrower_email, borrowed_at, due_at, returned_at, note, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NULL, $6, NOW(), NOW())
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(item.id)
        .bind(normalize_email(&dto.borrower_email))
        .bind(borrowed_at)
        .bind(dto.due_at)
        .bind(blank_to_none(dto.note))
        .fetch_one(&mut *tx)
        .await?;

        set_item_status(&mut tx, item.id, LoanItemStatus::OnLoan).await?;
        tx.commit().await?;

        tracing::info!(loan_id = %row.id, item = %item.code, "Item lent");
        Ok(row)
    }

    /// Close an open loan and make the item available again
    pub async fn return_loan(&self, id: RecordId) -> RepositoryResult<LoanRow> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<LoanRow>(id))?;

        let mut tx = self.pool.begin().await?;
        lock_item(&mut tx, existing.item_id).await?;

        let row = sqlx::query_as::<_, LoanRow>(&format!(
            r#"
            UPDATE loans SET returned_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND returned_at IS NULL
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::Conflict("Loan has already been returned".to_string()))?;

        set_item_status(&mut tx, row.item_id, LoanItemStatus::Available).await?;
        tx.commit().await?;

        tracing::info!(loan_id = %row.id, "Item returned");
        Ok(row)
    }

    /// Change the due date or note of a loan
    pub async fn update(&self, id: RecordId, dto: UpdateLoan) -> RepositoryResult<LoanRow> {
        let mut tx = self.pool.begin().await?;
        let existing = lock_loan(&mut tx, id).await?;

        let due_at = dto.due_at.unwrap_or(existing.due_at);
        if due_at <= existing.borrowed_at {
            return Err(RepositoryError::Validation(
                "dueAt must be after borrowedAt".to_string(),
            ));
        }
        let note = dto.note.map_or(existing.note, |n| blank_to_none(Some(n)));

        let row = sqlx::query_as::<_, LoanRow>(&format!(
            r#"
            UPDATE loans SET due_at = $2, note = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(id)
        .bind(due_at)
        .bind(&note)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Delete a loan; deleting an open loan frees the item
    pub async fn delete(&self, id: RecordId) -> RepositoryResult<()> {
        let item_id = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<LoanRow>(id))?
            .item_id;

        let mut tx = self.pool.begin().await?;
        lock_item(&mut tx, item_id).await?;
        // the loan may have been returned before the item lock was granted
        let existing = lock_loan(&mut tx, id).await?;

        sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if existing.is_open() {
            set_item_status(&mut tx, existing.item_id, LoanItemStatus::Available).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

async fn lock_item(tx: &mut Transaction<'_, Postgres>, item_id: RecordId) -> RepositoryResult<LoanItemRow> {
    sqlx::query_as::<_, LoanItemRow>(&format!(
        "SELECT {} FROM loan_items WHERE id = $1 FOR UPDATE",
        ITEM_COLUMNS
    ))
    .bind(item_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| not_found::<LoanItemRow>(item_id))
}

async fn lock_loan(tx: &mut Transaction<'_, Postgres>, id: RecordId) -> RepositoryResult<LoanRow> {
    sqlx::query_as::<_, LoanRow>(&format!("SELECT {} FROM loans WHERE id = $1 FOR UPDATE", LOAN_COLUMNS))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| not_found::<LoanRow>(id))
}

async fn set_item_status(
    tx: &mut Transaction<'_, Postgres>,
    item_id: RecordId,
    status: LoanItemStatus,
) -> RepositoryResult<()> {
    sqlx::query("UPDATE loan_items SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(item_id)
        .bind(status.as_str())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn loan(due_in: Duration, returned: bool) -> LoanRow {
        let now = Utc::now();
        LoanRow {
            id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            borrower_email: "ana@example.org".into(),
            borrowed_at: now - Duration::days(10),
            due_at: now + due_in,
            returned_at: returned.then_some(now),
            note: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_overdue_only_while_open() {
        let now = Utc::now();
        assert!(loan(Duration::days(-1), false).is_overdue(now));
        assert!(!loan(Duration::days(-1), true).is_overdue(now));
        assert!(!loan(Duration::days(3), false).is_overdue(now));
    }

    #[test]
    fn test_loan_filter_flags() {
        let filter: LoanFilter = serde_json::from_str(r#"{"overdue":true}"#).unwrap();
        assert_eq!(filter.overdue, Some(true));
        assert_eq!(filter.open, None);
    }

    async fn item(pool: &PgPool, code: &str) -> LoanItemRow {
        LoanItemRepository::new(pool.clone())
            .create(CreateLoanItem {
                code: code.into(),
                name: "Perceuse".into(),
                description: None,
            })
            .await
            .unwrap()
    }

    fn lend_to(item_id: RecordId, email: &str) -> CreateLoan {
        CreateLoan {
            item_id,
            borrower_email: email.into(),
            borrowed_at: None,
            due_at: Utc::now() + Duration::days(14),
            note: None,
        }
    }

    async fn item_status(pool: &PgPool, id: RecordId) -> LoanItemStatus {
        LoanItemRepository::new(pool.clone())
            .get(id)
            .await
            .unwrap()
            .status()
            .unwrap()
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_lend_and_return_flip_item_status(pool: PgPool) {
        let drill = item(&pool, "TOOL-1").await;
        let repo = LoanRepository::new(pool.clone());

        let loan = repo.lend(lend_to(drill.id, " Ana@Example.org")).await.unwrap();
        assert!(loan.is_open());
        assert_eq!(loan.borrower_email, "ana@example.org");
        assert_eq!(item_status(&pool, drill.id).await, LoanItemStatus::OnLoan);

        let returned = repo.return_loan(loan.id).await.unwrap();
        assert!(returned.returned_at.is_some());
        assert_eq!(item_status(&pool, drill.id).await, LoanItemStatus::Available);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_lending_an_item_on_loan_is_a_conflict(pool: PgPool) {
        let drill = item(&pool, "TOOL-1").await;
        let repo = LoanRepository::new(pool);

        repo.lend(lend_to(drill.id, "ana@example.org")).await.unwrap();
        let second = repo.lend(lend_to(drill.id, "ben@example.org")).await;
        assert!(matches!(second, Err(RepositoryError::Conflict(_))));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_second_return_is_a_conflict(pool: PgPool) {
        let drill = item(&pool, "TOOL-1").await;
        let repo = LoanRepository::new(pool);

        let loan = repo.lend(lend_to(drill.id, "ana@example.org")).await.unwrap();
        repo.return_loan(loan.id).await.unwrap();

        let again = repo.return_loan(loan.id).await;
        assert!(matches!(again, Err(RepositoryError::Conflict(_))));

        let missing = repo.return_loan(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(RepositoryError::NotFound(_))));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_deleting_returned_loan_keeps_new_loan_open(pool: PgPool) {
        let drill = item(&pool, "TOOL-1").await;
        let repo = LoanRepository::new(pool.clone());

        let old = repo.lend(lend_to(drill.id, "ana@example.org")).await.unwrap();
        repo.return_loan(old.id).await.unwrap();
        repo.lend(lend_to(drill.id, "ben@example.org")).await.unwrap();

        repo.delete(old.id).await.unwrap();
        assert_eq!(item_status(&pool, drill.id).await, LoanItemStatus::OnLoan);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_deleting_open_loan_frees_item(pool: PgPool) {
        let drill = item(&pool, "TOOL-1").await;
        let repo = LoanRepository::new(pool.clone());

        let loan = repo.lend(lend_to(drill.id, "ana@example.org")).await.unwrap();
        repo.delete(loan.id).await.unwrap();

        assert_eq!(item_status(&pool, drill.id).await, LoanItemStatus::Available);
        assert!(repo.find_by_id(loan.id).await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_update_rejects_due_before_borrowed(pool: PgPool) {
        let drill = item(&pool, "TOOL-1").await;
        let repo = LoanRepository::new(pool);
        let loan = repo.lend(lend_to(drill.id, "ana@example.org")).await.unwrap();

        let result = repo
            .update(
                loan.id,
                UpdateLoan {
                    due_at: Some(loan.borrowed_at - Duration::days(1)),
                    note: None,
                },
            )
            .await;
        assert!(matches!(result, Err(RepositoryError::Validation(_))));

        let updated = repo
            .update(
                loan.id,
                UpdateLoan {
                    due_at: None,
                    note: Some("  rendre avec la batterie ".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.note.as_deref(), Some("rendre avec la batterie"));
        assert_eq!(updated.due_at, loan.due_at);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_item_page_beyond_total_is_empty(pool: PgPool) {
        for code in ["TOOL-1", "TOOL-2", "TOOL-3"] {
            item(&pool, code).await;
        }
        let repo = LoanItemRepository::new(pool);

        let page = repo.paginate(&PaginationParams::new(4, 2)).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);

        let last = repo.paginate(&PaginationParams::new(2, 2)).await.unwrap();
        assert_eq!(last.items.len(), 1);
    }
}
