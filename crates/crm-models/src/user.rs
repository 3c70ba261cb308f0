//! Back-office user accounts
//!
//! Table: users

use serde::Deserialize;
use validator::Validate;

text_enum! {
    /// Back-office role; each role maps to a fixed permission set
    #[derive(Default)]
    pub enum Role: "role" {
        Admin => "admin",
        Manager => "manager",
        Volunteer => "volunteer",
        #[default]
        Viewer => "viewer",
    }
}

/// Login request body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "is not a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "can't be blank"))]
    pub password: String,
}

/// Create a user account (admin only)
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    #[validate(email(message = "is not a valid email"))]
    pub email: String,
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub display_name: String,
    /// Plain password, hashed before it reaches the database
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

/// Partial update of a user account
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub display_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

/// Check a plain password against the configured minimum length
pub fn check_password(password: &str, min_length: usize) -> Result<(), String> {
    if password.chars().count() < min_length {
        return Err(format!("must be at least {} characters", min_length));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CheckInput;

    #[test]
    fn test_role_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), *role);
        }
        assert!("root".parse::<Role>().is_err());
        assert_eq!(Role::default(), Role::Viewer);
    }

    #[test]
    fn test_create_user_defaults_to_viewer() {
        let dto: CreateUser = serde_json::from_str(
            r#"{"email":"ana@example.org","displayName":"Ana","password":"0123456789"}"#,
        )
        .unwrap();
        assert_eq!(dto.role, Role::Viewer);
        assert!(dto.check().is_ok());
    }

    #[test]
    fn test_create_user_rejects_bad_email() {
        let dto = CreateUser {
            email: "ana".into(),
            display_name: "Ana".into(),
            password: "0123456789".into(),
            role: Role::Manager,
        };
        let errors = dto.check().unwrap_err();
        assert!(errors.has_error("email"));
    }

    #[test]
    fn test_check_password() {
        assert!(check_password("short", 10).is_err());
        assert!(check_password("long enough pw", 10).is_ok());
    }
}
