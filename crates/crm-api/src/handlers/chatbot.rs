//! Natural-language query endpoint

use axum::{extract::State, response::IntoResponse, Json};
use crm_auth::builtin::ADMIN_VIEW;
use crm_chatbot::{ChatbotQuery, ChatbotResponse};
use serde::Serialize;

use crate::error::ApiResult;
use crate::extractors::{ApiJson, AppState, AuthenticatedUser};

#[derive(Debug, Serialize)]
struct QueryEnvelope {
    success: bool,
    #[serde(flatten)]
    response: ChatbotResponse,
}

/// POST /api/admin/chatbot/query
///
/// Always 200 once authorized; failures are reported through `success` and `error`.
pub async fn query(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(query): ApiJson<ChatbotQuery>,
) -> ApiResult<impl IntoResponse> {
    user.require(ADMIN_VIEW)?;

    let response = state.chatbot.answer(&query).await;
    if let Some(error) = response.error.as_deref() {
        tracing::warn!(user_id = user.id, error, "Chatbot query failed");
    }

    Ok(Json(QueryEnvelope {
        success: response.is_success(),
        response,
    }))
}
