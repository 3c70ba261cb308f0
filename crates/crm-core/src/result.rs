//! Result type alias

use crate::error::CrmError;

/// Standard Result type for CRM operations
pub type CrmResult<T> = Result<T, CrmError>;
