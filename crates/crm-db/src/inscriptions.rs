//! Inscription repository
//!
//! Capacity is enforced inside a transaction that locks the event row, so two
//! concurrent inscriptions cannot both take the last seat.

use chrono::{DateTime, Utc};
use crm_core::{Entity, PaginationParams, RecordId};
use crm_models::{normalize_email, CreateInscription, InscriptionStatus, UpdateInscription};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::events::{self, EventRow};
use crate::members::MemberRow;
use crate::repository::{
    blank_to_none, not_found, parse_column, PaginatedResult, RepositoryError, RepositoryResult,
};

/// Inscription row from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InscriptionRow {
    pub id: RecordId,
    pub event_id: RecordId,
    pub member_email: String,
    pub status: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InscriptionRow {
    pub fn status(&self) -> RepositoryResult<InscriptionStatus> {
        parse_column(&self.status)
    }
}

impl Entity for InscriptionRow {
    const TABLE_NAME: &'static str = "inscriptions";
    const TYPE_NAME: &'static str = "Inscription";
}

const COLUMNS: &str = "id, event_id, member_email, status, note, created_at, updated_at";

/// Inscription repository
#[derive(Clone)]
pub struct InscriptionRepository {
    pool: PgPool,
}

impl InscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: RecordId) -> RepositoryResult<Option<InscriptionRow>> {
        let row = sqlx::query_as::<_, InscriptionRow>(&format!(
            "SELECT {} FROM inscriptions WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Inscriptions of an event in arrival order
    pub async fn list_for_event(
        &self,
        event_id: RecordId,
        params: &PaginationParams,
    ) -> RepositoryResult<PaginatedResult<InscriptionRow>> {
        let event_exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;
        if !event_exists {
            return Err(not_found::<EventRow>(event_id));
        }

        let items = sqlx::query_as::<_, InscriptionRow>(&format!(
            "SELECT {} FROM inscriptions WHERE event_id = $1 ORDER BY created_at ASC LIMIT $2 OFFSET $3",
            COLUMNS
        ))
        .bind(event_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM inscriptions WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(PaginatedResult::new(items, total))
    }

    /// Register a member; the inscription is waitlisted when the event is full
    pub async fn register(&self, event_id: RecordId, dto: CreateInscription) -> RepositoryResult<InscriptionRow> {
        let email = normalize_email(&dto.member_email);
        let mut tx = self.pool.begin().await?;

        let event = lock_event(&mut tx, event_id).await?;
        if !event.status()?.accepts_inscriptions() {
            return Err(RepositoryError::Conflict(format!(
                "Event is {} and does not accept inscriptions",
                event.status
            )));
        }

        let member_exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM members WHERE email = $1)")
            .bind(&email)
            .fetch_one(&mut *tx)
            .await?;
        if !member_exists {
            return Err(not_found::<MemberRow>(&email));
        }

        let already = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM inscriptions WHERE event_id = $1 AND member_email = $2)",
        )
        .bind(event_id)
        .bind(&email)
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Err(RepositoryError::Conflict(
                "Member is already inscribed to this event".to_string(),
            ));
        }

        let taken = seats_taken(&mut tx, event_id).await?;
        let status = InscriptionStatus::for_new_inscription(event.capacity, taken);

        let row = sqlx::query_as::<_, InscriptionRow>(&format!(
            r#"
            INSERT INTO inscriptions (id, event_id, member_email, status, note, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(event_id)
        .bind(&email)
        .bind(status.as_str())
        .bind(blank_to_none(dto.note))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            event_id = %event_id,
            inscription_id = %row.id,
            status = %status,
            "Inscription created"
        );
        Ok(row)
    }

    /// Change status or note; freeing a seat promotes the waitlist
    pub async fn update(&self, id: RecordId, dto: UpdateInscription) -> RepositoryResult<InscriptionRow> {
        let event_id = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<InscriptionRow>(id))?
            .event_id;

        let mut tx = self.pool.begin().await?;
        let event = lock_event(&mut tx, event_id).await?;
        // the row may have changed before the event lock was granted
        let existing = lock_inscription(&mut tx, id).await?;

        let previous = existing.status()?;
        let status = dto.status.unwrap_or(previous);
        let note = dto.note.map_or(existing.note, |n| blank_to_none(Some(n)));

        if status.takes_seat() && !previous.takes_seat() {
            let taken = seats_taken(&mut tx, event.id).await?;
            if InscriptionStatus::for_new_inscription(event.capacity, taken) == InscriptionStatus::Waitlisted {
                return Err(RepositoryError::Conflict("Event is full".to_string()));
            }
        }

        let row = sqlx::query_as::<_, InscriptionRow>(&format!(
            r#"
            UPDATE inscriptions
            SET status = $2, note = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(&note)
        .fetch_one(&mut *tx)
        .await?;

        if previous.takes_seat() && !status.takes_seat() {
            promote_waitlist(&mut tx, &event).await?;
        }

        tx.commit().await?;
        Ok(row)
    }

    /// Remove an inscription; a freed seat goes to the oldest waitlisted member
    pub async fn delete(&self, id: RecordId) -> RepositoryResult<()> {
        let event_id = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<InscriptionRow>(id))?
            .event_id;

        let mut tx = self.pool.begin().await?;
        let event = lock_event(&mut tx, event_id).await?;
        // the row may have changed before the event lock was granted
        let existing = lock_inscription(&mut tx, id).await?;

        sqlx::query("DELETE FROM inscriptions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if existing.status()?.takes_seat() {
            promote_waitlist(&mut tx, &event).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

async fn lock_event(tx: &mut Transaction<'_, Postgres>, event_id: RecordId) -> RepositoryResult<EventRow> {
    sqlx::query_as::<_, EventRow>(&format!(
        "SELECT {} FROM events WHERE id = $1 FOR UPDATE",
        events::COLUMNS
    ))
    .bind(event_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| not_found::<EventRow>(event_id))
}

async fn lock_inscription(tx: &mut Transaction<'_, Postgres>, id: RecordId) -> RepositoryResult<InscriptionRow> {
    sqlx::query_as::<_, InscriptionRow>(&format!(
        "SELECT {} FROM inscriptions WHERE id = $1 FOR UPDATE",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| not_found::<InscriptionRow>(id))
}

async fn seats_taken(tx: &mut Transaction<'_, Postgres>, event_id: RecordId) -> RepositoryResult<i64> {
    let taken = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM inscriptions WHERE event_id = $1 AND status IN ('registered', 'attended')",
    )
    .bind(event_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(taken)
}

/// Move the oldest waitlisted inscriptions into the free seats
async fn promote_waitlist(tx: &mut Transaction<'_, Postgres>, event: &EventRow) -> RepositoryResult<u64> {
    let free = match event.capacity {
        Some(capacity) => (i64::from(capacity) - seats_taken(tx, event.id).await?).max(0),
        None => i64::MAX,
    };
    if free == 0 {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"
        UPDATE inscriptions SET status = 'registered', updated_at = NOW()
        WHERE id IN (
            SELECT id FROM inscriptions
            WHERE event_id = $1 AND status = 'waitlisted'
            ORDER BY created_at ASC
            LIMIT $2
        )
        "#,
    )
    .bind(event.id)
    .bind(free)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() > 0 {
        tracing::info!(
            event_id = %event.id,
            promoted = result.rows_affected(),
            "Waitlisted inscriptions promoted"
        );
    }
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventRepository;
    use crate::members::MemberRepository;
    use crate::repository::Repository;
    use chrono::Duration;
    use crm_models::{CreateEvent, CreateMember, EventStatus};

    async fn published_event(pool: &PgPool, capacity: Option<i32>) -> EventRow {
        let starts_at = Utc::now() + Duration::days(7);
        EventRepository::new(pool.clone())
            .create(CreateEvent {
                title: "Assemblée générale".into(),
                description: None,
                location: None,
                starts_at,
                ends_at: starts_at + Duration::hours(2),
                capacity,
                status: EventStatus::Published,
            })
            .await
            .unwrap()
    }

    async fn member(pool: &PgPool, email: &str) {
        MemberRepository::new(pool.clone())
            .create(CreateMember {
                email: email.into(),
                first_name: "Test".into(),
                last_name: email.into(),
                phone: None,
                status_code: None,
                joined_on: None,
                notes: None,
            })
            .await
            .unwrap();
    }

    fn inscription(email: &str) -> CreateInscription {
        CreateInscription {
            member_email: email.into(),
            note: None,
        }
    }

    async fn status_of(repo: &InscriptionRepository, id: RecordId) -> InscriptionStatus {
        repo.find_by_id(id).await.unwrap().unwrap().status().unwrap()
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_register_waitlists_over_capacity(pool: PgPool) {
        let event = published_event(&pool, Some(1)).await;
        member(&pool, "ana@example.org").await;
        member(&pool, "ben@example.org").await;
        let repo = InscriptionRepository::new(pool);

        let first = repo.register(event.id, inscription("ana@example.org")).await.unwrap();
        let second = repo.register(event.id, inscription("BEN@example.org ")).await.unwrap();

        assert_eq!(first.status().unwrap(), InscriptionStatus::Registered);
        assert_eq!(second.status().unwrap(), InscriptionStatus::Waitlisted);
        assert_eq!(second.member_email, "ben@example.org");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_cancelling_promotes_oldest_waitlisted(pool: PgPool) {
        let event = published_event(&pool, Some(1)).await;
        for email in ["ana@example.org", "ben@example.org", "cleo@example.org"] {
            member(&pool, email).await;
        }
        let repo = InscriptionRepository::new(pool);

        let first = repo.register(event.id, inscription("ana@example.org")).await.unwrap();
        let second = repo.register(event.id, inscription("ben@example.org")).await.unwrap();
        let third = repo.register(event.id, inscription("cleo@example.org")).await.unwrap();

        let cancelled = repo
            .update(
                first.id,
                UpdateInscription {
                    status: Some(InscriptionStatus::Cancelled),
                    note: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(cancelled.status().unwrap(), InscriptionStatus::Cancelled);
        assert_eq!(status_of(&repo, second.id).await, InscriptionStatus::Registered);
        assert_eq!(status_of(&repo, third.id).await, InscriptionStatus::Waitlisted);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_deleting_registered_promotes_waitlist(pool: PgPool) {
        let event = published_event(&pool, Some(1)).await;
        member(&pool, "ana@example.org").await;
        member(&pool, "ben@example.org").await;
        let repo = InscriptionRepository::new(pool);

        let first = repo.register(event.id, inscription("ana@example.org")).await.unwrap();
        let second = repo.register(event.id, inscription("ben@example.org")).await.unwrap();

        repo.delete(first.id).await.unwrap();

        assert!(repo.find_by_id(first.id).await.unwrap().is_none());
        assert_eq!(status_of(&repo, second.id).await, InscriptionStatus::Registered);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_rejoining_a_full_event_is_a_conflict(pool: PgPool) {
        let event = published_event(&pool, Some(1)).await;
        member(&pool, "ana@example.org").await;
        member(&pool, "ben@example.org").await;
        let repo = InscriptionRepository::new(pool);

        let first = repo.register(event.id, inscription("ana@example.org")).await.unwrap();
        let cancel = UpdateInscription {
            status: Some(InscriptionStatus::Cancelled),
            note: None,
        };
        repo.update(first.id, cancel).await.unwrap();
        repo.register(event.id, inscription("ben@example.org")).await.unwrap();

        let rejoin = UpdateInscription {
            status: Some(InscriptionStatus::Registered),
            note: None,
        };
        let result = repo.update(first.id, rejoin).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_register_errors(pool: PgPool) {
        let event = published_event(&pool, None).await;
        member(&pool, "ana@example.org").await;
        let repo = InscriptionRepository::new(pool);

        repo.register(event.id, inscription("ana@example.org")).await.unwrap();
        let duplicate = repo.register(event.id, inscription("ana@example.org")).await;
        assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))));

        let unknown = repo.register(event.id, inscription("nobody@example.org")).await;
        assert!(matches!(unknown, Err(RepositoryError::NotFound(_))));

        let missing_event = repo.register(Uuid::new_v4(), inscription("ana@example.org")).await;
        assert!(matches!(missing_event, Err(RepositoryError::NotFound(_))));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_page_beyond_total_is_empty(pool: PgPool) {
        let event = published_event(&pool, None).await;
        member(&pool, "ana@example.org").await;
        member(&pool, "ben@example.org").await;
        let repo = InscriptionRepository::new(pool);
        repo.register(event.id, inscription("ana@example.org")).await.unwrap();
        repo.register(event.id, inscription("ben@example.org")).await.unwrap();

        let page = repo
            .list_for_event(event.id, &PaginationParams::new(5, 10))
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 2);
    }
}
