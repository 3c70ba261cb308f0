//! Core error types for the association CRM

use std::collections::BTreeMap;
use thiserror::Error;

/// Core error type shared by every crate
#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },
}

/// Validation errors collection
///
/// Field errors are kept in a `BTreeMap` so that messages come out in a stable order.
#[derive(Error, Debug, Default, Clone, PartialEq, Eq)]
#[error("{}", self.full_messages().join(", "))]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> messages
    pub errors: BTreeMap<String, Vec<String>>,
    /// Errors not tied to a specific field
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    /// Check if there are errors for a specific field
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
    }

    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        for (field, field_messages) in &self.errors {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }

    /// `Ok(())` when empty, the collection itself otherwise
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(source: validator::ValidationErrors) -> Self {
        let mut errors = ValidationErrors::new();
        for (field, field_errors) in source.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| default_message(&error.code));
                if field == "__all__" {
                    errors.add_base(message);
                } else {
                    errors.add(to_camel_case(field), message);
                }
            }
        }
        errors
    }
}

fn default_message(code: &str) -> String {
    match code {
        "length" => "has an invalid length".to_string(),
        "email" => "is not a valid email".to_string(),
        "url" => "is not a valid URL".to_string(),
        "range" => "is out of range".to_string(),
        "required" => "can't be blank".to_string(),
        other => format!("is invalid ({})", other),
    }
}

/// Request bodies are camelCase, so field names are reported the same way.
fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// HTTP status code mapping for errors
impl CrmError {
    pub fn not_found(entity: &'static str, value: impl ToString) -> Self {
        CrmError::NotFound {
            entity,
            field: "id",
            value: value.to_string(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            CrmError::NotFound { .. } => 404,
            CrmError::Unauthorized { .. } => 401,
            CrmError::Forbidden { .. } => 403,
            CrmError::Validation(_) => 422,
            CrmError::Conflict { .. } => 409,
            CrmError::Database(_) | CrmError::Internal(_) | CrmError::Config(_) => 500,
            CrmError::ExternalService { .. } => 502,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            CrmError::NotFound { .. } => "not_found",
            CrmError::Unauthorized { .. } => "unauthorized",
            CrmError::Forbidden { .. } => "forbidden",
            CrmError::Validation(_) => "validation_failed",
            CrmError::Database(_) => "database_error",
            CrmError::Internal(_) => "internal_error",
            CrmError::Config(_) => "configuration_error",
            CrmError::ExternalService { .. } => "external_service_error",
            CrmError::Conflict { .. } => "conflict",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(email)]
        contact_email: String,
        #[validate(length(min = 1, message = "can't be blank"))]
        title: String,
    }

    #[test]
    fn test_add_and_full_messages() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "can't be blank");
        errors.add_base("Event is cancelled");

        assert!(errors.has_error("title"));
        assert_eq!(
            errors.full_messages(),
            vec!["Event is cancelled".to_string(), "title can't be blank".to_string()]
        );
    }

    #[test]
    fn test_merge() {
        let mut a = ValidationErrors::new();
        a.add("email", "is taken");
        let mut b = ValidationErrors::new();
        b.add("email", "is not a valid email");
        b.add_base("nope");

        a.merge(b);
        assert_eq!(a.get("email").map(Vec::len), Some(2));
        assert_eq!(a.base_errors, vec!["nope".to_string()]);
    }

    #[test]
    fn test_from_validator_errors() {
        let probe = Probe {
            contact_email: "not-an-email".into(),
            title: String::new(),
        };
        let errors: ValidationErrors = probe.validate().unwrap_err().into();

        assert_eq!(
            errors.get("contactEmail"),
            Some(&vec!["is not a valid email".to_string()])
        );
        assert_eq!(errors.get("title"), Some(&vec!["can't be blank".to_string()]));
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.add("x", "bad");
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CrmError::not_found("Event", 1).status_code(), 404);
        assert_eq!(
            CrmError::Forbidden { message: "no".into() }.status_code(),
            403
        );
        assert_eq!(
            CrmError::Validation(ValidationErrors::new()).error_code(),
            "validation_failed"
        );
        assert_eq!(
            CrmError::Conflict { message: "taken".into() }.status_code(),
            409
        );
    }
}
