//! Events and member inscriptions
//!
//! Tables: events, inscriptions

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::{Validate, ValidationError};

text_enum! {
    #[derive(Default)]
    pub enum EventStatus: "event status" {
        #[default]
        Draft => "draft",
        Published => "published",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

impl EventStatus {
    /// Only published events take inscriptions
    pub fn accepts_inscriptions(&self) -> bool {
        matches!(self, EventStatus::Published)
    }
}

text_enum! {
    pub enum InscriptionStatus: "inscription status" {
        Registered => "registered",
        Waitlisted => "waitlisted",
        Cancelled => "cancelled",
        Attended => "attended",
    }
}

impl InscriptionStatus {
    /// Status given to a new inscription given the event capacity and the
    /// number of seats already taken (registered or attended).
    pub fn for_new_inscription(capacity: Option<i32>, taken: i64) -> Self {
        match capacity {
            Some(capacity) if taken >= i64::from(capacity) => InscriptionStatus::Waitlisted,
            _ => InscriptionStatus::Registered,
        }
    }

    /// Whether this inscription holds a seat
    pub fn takes_seat(&self) -> bool {
        matches!(self, InscriptionStatus::Registered | InscriptionStatus::Attended)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_create_schedule"))]
pub struct CreateEvent {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(length(max = 200, message = "is too long"))]
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub capacity: Option<i32>,
    #[serde(default)]
    pub status: EventStatus,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvent {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 200, message = "is too long"))]
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub capacity: Option<i32>,
    pub status: Option<EventStatus>,
}

/// Check the schedule of an event once partial updates are merged
pub fn check_schedule(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), ValidationError> {
    if ends_at < starts_at {
        let mut error = ValidationError::new("schedule");
        error.message = Some("endsAt must not be before startsAt".into());
        return Err(error);
    }
    Ok(())
}

fn validate_create_schedule(dto: &CreateEvent) -> Result<(), ValidationError> {
    check_schedule(dto.starts_at, dto.ends_at)
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInscription {
    #[validate(email(message = "is not a valid email"))]
    pub member_email: String,
    #[validate(length(max = 500, message = "is too long"))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInscription {
    pub status: Option<InscriptionStatus>,
    #[validate(length(max = 500, message = "is too long"))]
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CheckInput;
    use chrono::Duration;

    fn event(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> CreateEvent {
        CreateEvent {
            title: "Assemblée générale".into(),
            description: None,
            location: Some("Salle des fêtes".into()),
            starts_at,
            ends_at,
            capacity: Some(80),
            status: EventStatus::Draft,
        }
    }

    #[test]
    fn test_schedule_must_be_ordered() {
        let start = Utc::now();
        assert!(event(start, start + Duration::hours(2)).check().is_ok());
        assert!(event(start, start).check().is_ok());

        let errors = event(start, start - Duration::minutes(1)).check().unwrap_err();
        assert_eq!(errors.base_errors, vec!["endsAt must not be before startsAt".to_string()]);
    }

    #[test]
    fn test_capacity_must_be_positive() {
        let start = Utc::now();
        let mut dto = event(start, start + Duration::hours(1));
        dto.capacity = Some(0);
        assert!(dto.check().unwrap_err().has_error("capacity"));
    }

    #[test]
    fn test_new_inscription_status() {
        assert_eq!(InscriptionStatus::for_new_inscription(None, 500), InscriptionStatus::Registered);
        assert_eq!(InscriptionStatus::for_new_inscription(Some(2), 1), InscriptionStatus::Registered);
        assert_eq!(InscriptionStatus::for_new_inscription(Some(2), 2), InscriptionStatus::Waitlisted);
        assert_eq!(InscriptionStatus::for_new_inscription(Some(2), 3), InscriptionStatus::Waitlisted);
    }

    #[test]
    fn test_only_published_events_accept_inscriptions() {
        assert!(EventStatus::Published.accepts_inscriptions());
        assert!(!EventStatus::Draft.accepts_inscriptions());
        assert!(!EventStatus::Cancelled.accepts_inscriptions());
    }
}
