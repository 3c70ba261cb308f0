//! Request authentication
//!
//! The bearer token from the `Authorization` header wins; the auth cookie is
//! the fallback.

use axum::http::{header, HeaderMap};
use std::sync::Arc;

use crate::cookie::{extract_cookie, CookieConfig};
use crate::error::AuthError;
use crate::jwt::{extract_bearer_token, JwtError, JwtService};
use crate::permissions::CurrentUser;

/// Authentication strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// JWT Bearer token
    Bearer,
    /// JWT in the auth cookie
    Cookie,
}

/// Authenticator for validating requests
#[derive(Clone)]
pub struct Authenticator {
    jwt: Arc<JwtService>,
    cookie: CookieConfig,
}

impl Authenticator {
    pub fn new(jwt: Arc<JwtService>, cookie: CookieConfig) -> Self {
        Self { jwt, cookie }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    pub fn cookie(&self) -> &CookieConfig {
        &self.cookie
    }

    /// Authenticate a request from its headers
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<CurrentUser, AuthError> {
        let (strategy, token) = self.find_token(headers).ok_or(AuthError::Required)?;

        let claims = self.jwt.validate_token(&token).map_err(|e| {
            tracing::debug!(?strategy, error = %e, "Token rejected");
            match e {
                JwtError::Expired => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        CurrentUser::from_claims(&claims)
    }

    fn find_token(&self, headers: &HeaderMap) -> Option<(AuthStrategy, String)> {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer_token);
        if let Some(token) = bearer {
            return Some((AuthStrategy::Bearer, token.to_string()));
        }

        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|cookie| extract_cookie(cookie, &self.cookie.name))
            .map(|token| (AuthStrategy::Cookie, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use crm_models::Role;

    const SECRET: &[u8] = b"test-secret-key-at-least-32-bytes";

    fn authenticator() -> Authenticator {
        Authenticator::new(
            Arc::new(JwtService::new(SECRET, 3600)),
            CookieConfig::new("crm_token", 3600),
        )
    }

    #[test]
    fn test_bearer_authentication() {
        let auth = authenticator();
        let token = auth.jwt().create_token(1, "a@example.org", Role::Manager).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );

        let user = auth.authenticate(&headers).unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.role, Role::Manager);
    }

    #[test]
    fn test_cookie_authentication() {
        let auth = authenticator();
        let token = auth.jwt().create_token(5, "v@example.org", Role::Volunteer).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; crm_token={}", token)).unwrap(),
        );

        let user = auth.authenticate(&headers).unwrap();
        assert_eq!(user.id, 5);
    }

    #[test]
    fn test_bearer_takes_precedence_over_cookie() {
        let auth = authenticator();
        let bearer = auth.jwt().create_token(1, "a@example.org", Role::Admin).unwrap();
        let cookie = auth.jwt().create_token(2, "b@example.org", Role::Viewer).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer)).unwrap(),
        );
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("crm_token={}", cookie)).unwrap(),
        );

        assert_eq!(auth.authenticate(&headers).unwrap().id, 1);
    }

    #[test]
    fn test_authentication_required() {
        let auth = authenticator();
        assert!(matches!(
            auth.authenticate(&HeaderMap::new()),
            Err(AuthError::Required)
        ));
    }

    #[test]
    fn test_garbage_token() {
        let auth = authenticator();
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer not.a.jwt"));

        assert!(matches!(
            auth.authenticate(&headers),
            Err(AuthError::InvalidToken)
        ));
    }
}
