//! Development requests (feature and bug requests for the back-office itself)
//!
//! Table: development_requests

use serde::Deserialize;
use validator::Validate;

text_enum! {
    #[derive(Default)]
    pub enum DevRequestPriority: "priority" {
        Low => "low",
        #[default]
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

text_enum! {
    #[derive(Default)]
    pub enum DevRequestStatus: "development request status" {
        #[default]
        Open => "open",
        InProgress => "in_progress",
        Done => "done",
        Rejected => "rejected",
    }
}

impl DevRequestStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, DevRequestStatus::Open | DevRequestStatus::InProgress)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDevRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(max = 10000, message = "is too long"))]
    pub description: Option<String>,
    #[validate(email(message = "is not a valid email"))]
    pub requester_email: String,
    #[serde(default)]
    pub priority: DevRequestPriority,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDevRequest {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 10000, message = "is too long"))]
    pub description: Option<String>,
    pub priority: Option<DevRequestPriority>,
    pub status: Option<DevRequestStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let dto: CreateDevRequest = serde_json::from_str(
            r#"{"title":"Export CSV des adhérents","requesterEmail":"ana@example.org"}"#,
        )
        .unwrap();
        assert_eq!(dto.priority, DevRequestPriority::Medium);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("critical".parse::<DevRequestPriority>().unwrap(), DevRequestPriority::Critical);
        let err = "urgent".parse::<DevRequestPriority>().unwrap_err();
        assert_eq!(err.to_string(), "unknown priority 'urgent'");
    }
}
