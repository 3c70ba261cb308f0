//! Member status definitions (e.g. "active", "honorary", "lapsed")
//!
//! Table: member_statuses

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use validator::Validate;

static STATUS_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_-]{1,50}$").expect("static regex"));

pub(crate) static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("static regex"));

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberStatus {
    #[validate(regex(path = "STATUS_CODE", message = "must be a lowercase slug"))]
    pub code: String,
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub label: String,
    #[validate(regex(path = "HEX_COLOR", message = "must be a #rrggbb color"))]
    pub color: Option<String>,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberStatus {
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub label: Option<String>,
    #[validate(regex(path = "HEX_COLOR", message = "must be a #rrggbb color"))]
    pub color: Option<String>,
    pub position: Option<i32>,
}
