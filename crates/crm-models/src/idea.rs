//! Ideas submitted by members and volunteers
//!
//! Table: ideas

use serde::Deserialize;
use validator::Validate;

text_enum! {
    #[derive(Default)]
    pub enum IdeaStatus: "idea status" {
        #[default]
        New => "new",
        UnderReview => "under_review",
        Accepted => "accepted",
        Rejected => "rejected",
        Done => "done",
    }
}

impl IdeaStatus {
    /// Ideas still waiting for a decision
    pub fn is_pending(&self) -> bool {
        matches!(self, IdeaStatus::New | IdeaStatus::UnderReview)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIdea {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(max = 5000, message = "is too long"))]
    pub description: Option<String>,
    #[validate(email(message = "is not a valid email"))]
    pub author_email: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIdea {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "is too long"))]
    pub description: Option<String>,
    pub status: Option<IdeaStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CheckInput;

    #[test]
    fn test_pending_statuses() {
        let pending: Vec<_> = IdeaStatus::ALL.iter().filter(|s| s.is_pending()).collect();
        assert_eq!(pending, vec![&IdeaStatus::New, &IdeaStatus::UnderReview]);
    }

    #[test]
    fn test_create_idea_requires_title() {
        let dto = CreateIdea {
            title: String::new(),
            description: None,
            author_email: "ana@example.org".into(),
        };
        assert!(dto.check().unwrap_err().has_error("title"));
    }

    #[test]
    fn test_update_status_json() {
        let dto: UpdateIdea = serde_json::from_str(r#"{"status":"under_review"}"#).unwrap();
        assert_eq!(dto.status, Some(IdeaStatus::UnderReview));
    }
}
