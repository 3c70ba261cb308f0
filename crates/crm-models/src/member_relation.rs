//! Relations between two members (family, referrer, ...)
//!
//! Table: member_relations

use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::member::normalize_email;

text_enum! {
    pub enum RelationType: "relation type" {
        Family => "family",
        Partner => "partner",
        Referrer => "referrer",
        Colleague => "colleague",
        Other => "other",
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_not_self"))]
pub struct CreateMemberRelation {
    #[validate(email(message = "is not a valid email"))]
    pub member_email: String,
    #[validate(email(message = "is not a valid email"))]
    pub related_email: String,
    pub relation_type: RelationType,
    #[validate(length(max = 500, message = "is too long"))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRelation {
    pub relation_type: Option<RelationType>,
    #[validate(length(max = 500, message = "is too long"))]
    pub note: Option<String>,
}

fn validate_not_self(dto: &CreateMemberRelation) -> Result<(), ValidationError> {
    if normalize_email(&dto.member_email) == normalize_email(&dto.related_email) {
        let mut error = ValidationError::new("self_relation");
        error.message = Some("A member cannot be related to themselves".into());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CheckInput;

    #[test]
    fn test_self_relation_rejected_case_insensitively() {
        let dto = CreateMemberRelation {
            member_email: "ana@example.org".into(),
            related_email: "ANA@Example.org".into(),
            relation_type: RelationType::Family,
            note: None,
        };
        let errors = dto.check().unwrap_err();
        assert_eq!(
            errors.base_errors,
            vec!["A member cannot be related to themselves".to_string()]
        );
    }

    #[test]
    fn test_relation_between_two_members() {
        let dto = CreateMemberRelation {
            member_email: "ana@example.org".into(),
            related_email: "bruno@example.org".into(),
            relation_type: RelationType::Referrer,
            note: Some("brought Bruno to the spring fair".into()),
        };
        assert!(dto.check().is_ok());
    }

    #[test]
    fn test_relation_type_json() {
        let t: RelationType = serde_json::from_str("\"colleague\"").unwrap();
        assert_eq!(t, RelationType::Colleague);
        assert!(serde_json::from_str::<RelationType>("\"enemy\"").is_err());
    }
}
