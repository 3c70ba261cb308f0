//! Core traits shared by rows and services

use uuid::Uuid;

/// Primary key type of user accounts
pub type Id = i64;

/// Primary key type of every domain record
pub type RecordId = Uuid;

/// Base trait for all persisted entities
pub trait Entity: Send + Sync {
    /// The database table name
    const TABLE_NAME: &'static str;

    /// Human-readable type name for error messages
    const TYPE_NAME: &'static str;
}

/// User context for permission checks
pub trait UserContext: Send + Sync {
    fn user_id(&self) -> Id;
    fn is_admin(&self) -> bool;
    /// Check if the user holds a global permission such as `events.write`
    fn allowed(&self, permission: &str) -> bool;
}
