//! API request handlers

pub mod auth;
pub mod chatbot;
pub mod dev_requests;
pub mod events;
pub mod ideas;
pub mod loans;
pub mod member_relations;
pub mod member_statuses;
pub mod member_tags;
pub mod member_tasks;
pub mod members;
pub mod tools;
pub mod tracking;
pub mod users;

use axum::Json;
use crm_core::{PaginatedResponse, PaginationParams};
use crm_db::PaginatedResult;

/// List envelope with page information
pub(crate) fn page<T>(result: PaginatedResult<T>, params: &PaginationParams) -> Json<PaginatedResponse<T>> {
    Json(PaginatedResponse::new(result.items, result.total, params))
}
