//! Permission system
//!
//! Every role maps to a fixed set of global permissions. There are no
//! per-record grants.

use crm_core::traits::{Id, UserContext};
use crm_models::Role;
use std::collections::HashSet;

use crate::error::AuthError;
use crate::jwt::Claims;

// ============================================================================
// Permission Definition
// ============================================================================

/// Built-in permission definitions
pub mod builtin {
    pub const MEMBERS_READ: &str = "members.read";
    pub const MEMBERS_WRITE: &str = "members.write";
    pub const EVENTS_READ: &str = "events.read";
    pub const EVENTS_WRITE: &str = "events.write";
    pub const IDEAS_READ: &str = "ideas.read";
    pub const IDEAS_WRITE: &str = "ideas.write";
    pub const LOANS_READ: &str = "loans.read";
    pub const LOANS_WRITE: &str = "loans.write";
    pub const TOOLS_READ: &str = "tools.read";
    pub const TOOLS_WRITE: &str = "tools.write";
    pub const TRACKING_READ: &str = "tracking.read";
    pub const TRACKING_WRITE: &str = "tracking.write";
    pub const DEV_REQUESTS_READ: &str = "dev_requests.read";
    pub const DEV_REQUESTS_WRITE: &str = "dev_requests.write";

    /// Back-office views such as the query assistant
    pub const ADMIN_VIEW: &str = "admin.view";
    /// User account administration
    pub const ADMIN_MANAGE: &str = "admin.manage";

    pub const READ: &[&str] = &[
        MEMBERS_READ,
        EVENTS_READ,
        IDEAS_READ,
        LOANS_READ,
        TOOLS_READ,
        TRACKING_READ,
        DEV_REQUESTS_READ,
    ];

    pub const WRITE: &[&str] = &[
        MEMBERS_WRITE,
        EVENTS_WRITE,
        IDEAS_WRITE,
        LOANS_WRITE,
        TOOLS_WRITE,
        TRACKING_WRITE,
        DEV_REQUESTS_WRITE,
    ];
}

use builtin::*;

/// Permissions granted to a role, sorted
pub fn role_permissions(role: Role) -> Vec<&'static str> {
    let mut permissions: Vec<&'static str> = READ.to_vec();
    match role {
        Role::Admin => {
            permissions.extend_from_slice(WRITE);
            permissions.push(ADMIN_VIEW);
            permissions.push(ADMIN_MANAGE);
        }
        Role::Manager => {
            permissions.extend_from_slice(WRITE);
            permissions.push(ADMIN_VIEW);
        }
        Role::Volunteer => {
            permissions.extend_from_slice(&[EVENTS_WRITE, IDEAS_WRITE, LOANS_WRITE]);
        }
        Role::Viewer => {}
    }
    permissions.sort_unstable();
    permissions
}

// ============================================================================
// User Context
// ============================================================================

/// Current user with permissions
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Id,
    pub email: String,
    pub role: Role,
    permissions: HashSet<&'static str>,
}

impl CurrentUser {
    pub fn new(id: Id, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            email: email.into(),
            role,
            permissions: role_permissions(role).into_iter().collect(),
        }
    }

    /// Build the user from validated token claims
    pub fn from_claims(claims: &Claims) -> Result<Self, AuthError> {
        let id = claims.user_id().map_err(|_| AuthError::InvalidToken)?;
        Ok(Self::new(id, claims.email.clone(), claims.role))
    }

    /// Check if user has global permission
    pub fn allowed_globally(&self, permission: &str) -> bool {
        if self.is_admin() {
            return true;
        }
        self.permissions.contains(permission)
    }

    /// `Forbidden` unless the permission is held
    pub fn require(&self, permission: &str) -> Result<(), AuthError> {
        if self.allowed_globally(permission) {
            Ok(())
        } else {
            tracing::debug!(user_id = self.id, permission, "Permission denied");
            Err(AuthError::Forbidden)
        }
    }

    /// Permission names, sorted
    pub fn permissions(&self) -> Vec<&'static str> {
        role_permissions(self.role)
    }
}

impl UserContext for CurrentUser {
    fn user_id(&self) -> Id {
        self.id
    }

    fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    fn allowed(&self, permission: &str) -> bool {
        self.allowed_globally(permission)
    }
}

// ============================================================================
// Tests
// ============================================================================
