//! Lendable items and loans
//!
//! Tables: loan_items, loans

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::{Validate, ValidationError};

text_enum! {
    #[derive(Default)]
    pub enum LoanItemStatus: "loan item status" {
        #[default]
        Available => "available",
        OnLoan => "on_loan",
        Maintenance => "maintenance",
        Retired => "retired",
    }
}

impl LoanItemStatus {
    pub fn can_be_lent(&self) -> bool {
        matches!(self, LoanItemStatus::Available)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoanItem {
    #[validate(length(min = 1, max = 50, message = "must be between 1 and 50 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub name: String,
    pub description: Option<String>,
}

/// `on_loan` is driven by lend/return and cannot be set by hand
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_manual_status"))]
pub struct UpdateLoanItem {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<LoanItemStatus>,
}

fn validate_manual_status(dto: &UpdateLoanItem) -> Result<(), ValidationError> {
    if dto.status == Some(LoanItemStatus::OnLoan) {
        let mut error = ValidationError::new("status");
        error.message = Some("status on_loan is set by lending the item".into());
        return Err(error);
    }
    Ok(())
}

/// Lend an item to a member
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_due_after_borrow"))]
pub struct CreateLoan {
    pub item_id: uuid::Uuid,
    #[validate(email(message = "is not a valid email"))]
    pub borrower_email: String,
    /// Defaults to now
    pub borrowed_at: Option<DateTime<Utc>>,
    pub due_at: DateTime<Utc>,
    #[validate(length(max = 500, message = "is too long"))]
    pub note: Option<String>,
}

impl CreateLoan {
    pub fn borrowed_at_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.borrowed_at.unwrap_or(now)
    }
}

fn validate_due_after_borrow(dto: &CreateLoan) -> Result<(), ValidationError> {
    let borrowed_at = dto.borrowed_at_or(Utc::now());
    if dto.due_at <= borrowed_at {
        let mut error = ValidationError::new("due_at");
        error.message = Some("dueAt must be after borrowedAt".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLoan {
    pub due_at: Option<DateTime<Utc>>,
    #[validate(length(max = 500, message = "is too long"))]
    pub note: Option<String>,
}

/// A loan is overdue when it is still open past its due date
pub fn is_overdue(due_at: DateTime<Utc>, returned_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    returned_at.is_none() && due_at < now
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CheckInput;
    use chrono::Duration;

    #[test]
    fn test_due_must_follow_borrow() {
        let now = Utc::now();
        let dto = CreateLoan {
            item_id: uuid::Uuid::new_v4(),
            borrower_email: "ana@example.org".into(),
            borrowed_at: Some(now),
            due_at: now - Duration::days(1),
            note: None,
        };
        let errors = dto.check().unwrap_err();
        assert_eq!(errors.base_errors, vec!["dueAt must be after borrowedAt".to_string()]);

        let dto = CreateLoan {
            due_at: now + Duration::days(14),
            ..dto
        };
        assert!(dto.check().is_ok());
    }

    #[test]
    fn test_on_loan_cannot_be_set_manually() {
        let dto = UpdateLoanItem {
            status: Some(LoanItemStatus::OnLoan),
            ..Default::default()
        };
        assert!(dto.check().is_err());

        let dto = UpdateLoanItem {
            status: Some(LoanItemStatus::Maintenance),
            ..Default::default()
        };
        assert!(dto.check().is_ok());
    }

    #[test]
    fn test_is_overdue() {
        let now = Utc::now();
        assert!(is_overdue(now - Duration::days(1), None, now));
        assert!(!is_overdue(now - Duration::days(1), Some(now), now));
        assert!(!is_overdue(now + Duration::days(1), None, now));
    }

    #[test]
    fn test_only_available_items_can_be_lent() {
        assert!(LoanItemStatus::Available.can_be_lent());
        assert!(!LoanItemStatus::OnLoan.can_be_lent());
        assert!(!LoanItemStatus::Maintenance.can_be_lent());
        assert!(!LoanItemStatus::Retired.can_be_lent());
    }
}
