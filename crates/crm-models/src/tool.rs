//! Tools catalog (shared documents, software, external services)
//!
//! Tables: tool_categories, tools

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateToolCategory {
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateToolCategory {
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTool {
    pub category_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub name: String,
    #[validate(url(message = "is not a valid URL"))]
    pub url: String,
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTool {
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub name: Option<String>,
    #[validate(url(message = "is not a valid URL"))]
    pub url: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CheckInput;

    #[test]
    fn test_tool_url_must_be_valid() {
        let dto: CreateTool = serde_json::from_value(serde_json::json!({
            "categoryId": Uuid::new_v4(),
            "name": "Comptabilité",
            "url": "not a url"
        }))
        .unwrap();
        assert!(dto.active);
        assert!(dto.check().unwrap_err().has_error("url"));
    }

    #[test]
    fn test_tool_valid() {
        let dto: CreateTool = serde_json::from_value(serde_json::json!({
            "categoryId": Uuid::new_v4(),
            "name": "Drive partagé",
            "url": "https://drive.example.org/asso",
            "active": false
        }))
        .unwrap();
        assert!(!dto.active);
        assert!(dto.check().is_ok());
    }
}
