//! # crm-auth
//!
//! Authentication and authorization for the association CRM.
//!
//! ## Features
//!
//! - JWT authentication (bearer header or HttpOnly cookie)
//! - argon2id password hashing
//! - Role-based permission sets

pub mod cookie;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod permissions;

pub use cookie::{extract_cookie, CookieConfig};
pub use error::AuthError;
pub use jwt::{extract_bearer_token, Claims, JwtError, JwtService};
pub use middleware::{AuthStrategy, Authenticator};
pub use password::{hash_password, verify_password};
pub use permissions::{builtin, role_permissions, CurrentUser};
