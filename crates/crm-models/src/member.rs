//! Association members
//!
//! Table: members. Other member tables reference a member by e-mail.

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

/// Canonical form of an e-mail used as a foreign key
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMember {
    #[validate(email(message = "is not a valid email"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub last_name: String,
    #[validate(length(max = 40, message = "is too long"))]
    pub phone: Option<String>,
    /// Code of a member status
    pub status_code: Option<String>,
    pub joined_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMember {
    #[validate(email(message = "is not a valid email"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub last_name: Option<String>,
    #[validate(length(max = 40, message = "is too long"))]
    pub phone: Option<String>,
    pub status_code: Option<String>,
    pub joined_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CheckInput;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ana.Silva@Example.ORG "), "ana.silva@example.org");
    }

    #[test]
    fn test_create_member_validation() {
        let dto: CreateMember = serde_json::from_str(
            r#"{"email":"ana@example.org","firstName":"","lastName":"Silva"}"#,
        )
        .unwrap();
        let errors = dto.check().unwrap_err();
        assert!(errors.has_error("firstName"));
        assert!(!errors.has_error("email"));
    }

    #[test]
    fn test_update_member_empty_is_valid() {
        assert!(UpdateMember::default().check().is_ok());
    }
}
