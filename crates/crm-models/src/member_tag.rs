//! Member tags and their assignment to members
//!
//! Tables: member_tags, member_tag_assignments

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::member_status::HEX_COLOR;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberTag {
    #[validate(length(min = 1, max = 60, message = "must be between 1 and 60 characters"))]
    pub name: String,
    #[validate(regex(path = "HEX_COLOR", message = "must be a #rrggbb color"))]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberTag {
    #[validate(length(min = 1, max = 60, message = "must be between 1 and 60 characters"))]
    pub name: Option<String>,
    #[validate(regex(path = "HEX_COLOR", message = "must be a #rrggbb color"))]
    pub color: Option<String>,
}

/// Body of `POST /api/members/:id/tags`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTag {
    pub tag_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CheckInput;

    #[test]
    fn test_tag_color() {
        let dto = CreateMemberTag {
            name: "Bénévole".into(),
            color: Some("#00ff00".into()),
        };
        assert!(dto.check().is_ok());

        let dto = CreateMemberTag {
            name: "Bénévole".into(),
            color: Some("green".into()),
        };
        let errors = dto.check().unwrap_err();
        assert_eq!(errors.get("color"), Some(&vec!["must be a #rrggbb color".to_string()]));
    }

    #[test]
    fn test_assign_tag_body() {
        let id = Uuid::new_v4();
        let body: AssignTag = serde_json::from_str(&format!(r#"{{"tagId":"{}"}}"#, id)).unwrap();
        assert_eq!(body.tag_id, id);
    }
}
