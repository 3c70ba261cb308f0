//! # crm-api
//!
//! JSON REST API for the association CRM.
//!
//! Every resource lives under `/api`; handlers check the caller's permission
//! before touching the database and return errors as `{ success: false, ... }`.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use extractors::AppState;
pub use routes::router;
