//! Axum extractors for API handlers

use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts, Query},
    http::request::Parts,
};
use crm_auth::{Authenticator, CookieConfig, CurrentUser, JwtService};
use crm_chatbot::ChatbotService;
use crm_core::pagination::{DEFAULT_LIMIT, DEFAULT_PAGE};
use crm_core::{AppConfig, PaginationParams};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ApiError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub auth: Authenticator,
    pub config: Arc<AppConfig>,
    pub chatbot: Arc<ChatbotService>,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig, chatbot: Arc<ChatbotService>) -> Self {
        let jwt = JwtService::new(
            config.auth.jwt_secret.as_bytes(),
            config.auth.token_expiration_seconds,
        );
        let cookie = CookieConfig::new(
            config.auth.cookie_name.clone(),
            i64::try_from(config.auth.token_expiration_seconds).unwrap_or(i64::MAX),
        );

        Self {
            pool,
            auth: Authenticator::new(Arc::new(jwt), cookie),
            config: Arc::new(config),
            chatbot,
        }
    }
}

/// Authenticated user extractor
pub struct AuthenticatedUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let user = app_state.auth.authenticate(&parts.headers)?;
        Ok(AuthenticatedUser(user))
    }
}

impl std::ops::Deref for AuthenticatedUser {
    type Target = CurrentUser;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Normalized `page` / `limit`; an unparseable value falls back to its own default
pub struct Pagination(pub PaginationParams);

impl Pagination {
    fn from_pairs(pairs: &HashMap<String, String>) -> Self {
        let field = |name: &str, default: i64| {
            pairs
                .get(name)
                .and_then(|raw| raw.trim().parse::<i64>().ok())
                .unwrap_or(default)
        };
        let params = PaginationParams {
            page: field("page", DEFAULT_PAGE),
            limit: field("limit", DEFAULT_LIMIT),
        };
        Pagination(params.normalized())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .unwrap_or_default();
        Ok(Pagination::from_pairs(&pairs))
    }
}

impl std::ops::Deref for Pagination {
    type Target = PaginationParams;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// JSON body with rejections rendered as [`ApiError`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string with rejections rendered as [`ApiError`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters with rejections rendered as [`ApiError`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn pagination_for(uri: &str) -> PaginationParams {
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        let Pagination(params) = Pagination::from_request_parts(&mut parts, &()).await.unwrap();
        params
    }

    #[tokio::test]
    async fn test_invalid_limit_keeps_valid_page() {
        let params = pagination_for("/members?page=3&limit=abc").await;
        assert_eq!(params.page, 3);
        assert_eq!(params.limit, DEFAULT_LIMIT);
    }

    #[tokio::test]
    async fn test_invalid_page_keeps_valid_limit() {
        let params = pagination_for("/members?page=x&limit=5").await;
        assert_eq!(params.page, DEFAULT_PAGE);
        assert_eq!(params.limit, 5);
    }

    #[tokio::test]
    async fn test_pagination_defaults_and_clamping() {
        let params = pagination_for("/members").await;
        assert_eq!((params.page, params.limit), (DEFAULT_PAGE, DEFAULT_LIMIT));

        let params = pagination_for("/members?page=0&limit=1000").await;
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, crm_core::pagination::MAX_LIMIT);
    }
}
