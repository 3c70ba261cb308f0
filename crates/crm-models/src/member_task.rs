//! Follow-up tasks attached to a member
//!
//! Table: member_tasks

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use validator::Validate;

text_enum! {
    #[derive(Default)]
    pub enum TaskStatus: "task status" {
        #[default]
        Todo => "todo",
        InProgress => "in_progress",
        Done => "done",
        Cancelled => "cancelled",
    }
}

impl TaskStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Todo | TaskStatus::InProgress)
    }

    /// Value of `completed_at` after a transition from `previous` to `self`
    pub fn completed_at(
        &self,
        previous: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        match self {
            TaskStatus::Done => Some(previous.unwrap_or(now)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberTask {
    #[validate(email(message = "is not a valid email"))]
    pub member_email: String,
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: String,
    pub description: Option<String>,
    pub due_on: Option<NaiveDate>,
    #[serde(default)]
    pub status: TaskStatus,
    /// E-mail of the back-office user in charge
    #[validate(email(message = "is not a valid email"))]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberTask {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_on: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
    #[validate(email(message = "is not a valid email"))]
    pub assigned_to: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_completed_at_transitions() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();

        assert_eq!(TaskStatus::Done.completed_at(None, now), Some(now));
        assert_eq!(TaskStatus::Done.completed_at(Some(earlier), now), Some(earlier));
        assert_eq!(TaskStatus::Todo.completed_at(Some(earlier), now), None);
        assert_eq!(TaskStatus::Cancelled.completed_at(None, now), None);
    }

    #[test]
    fn test_open_statuses() {
        assert!(TaskStatus::Todo.is_open());
        assert!(TaskStatus::InProgress.is_open());
        assert!(!TaskStatus::Done.is_open());
        assert_eq!(TaskStatus::default(), TaskStatus::Todo);
    }
}
