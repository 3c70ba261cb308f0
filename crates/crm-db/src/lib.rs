//! # crm-db
//!
//! Database layer for the association CRM.
//!
//! This crate provides PostgreSQL database access using SQLx, including:
//!
//! - Connection pool management and migrations
//! - Repository pattern for CRUD operations
//! - Transactional inscription and loan workflows
//! - Read-only execution of generated SELECT statements
//!
//! ## Example
//!
//! ```ignore
//! use crm_db::{Database, MemberRepository, Repository};
//!
//! let db = Database::connect(&config.database).await?;
//! db.migrate().await?;
//!
//! let repo = MemberRepository::new(db.pool().clone());
//! let member = repo.get(id).await?;
//! ```

pub mod dev_requests;
pub mod events;
pub mod ideas;
pub mod inscriptions;
pub mod loans;
pub mod member_relations;
pub mod member_statuses;
pub mod member_tags;
pub mod member_tasks;
pub mod members;
pub mod pool;
pub mod readonly;
pub mod repository;
pub mod tools;
pub mod tracking;
pub mod users;

// Re-exports
pub use pool::{Database, PoolStats};
pub use repository::{not_found, PaginatedResult, Repository, RepositoryError, RepositoryResult};

pub use dev_requests::{DevRequestFilter, DevRequestRepository, DevRequestRow};
pub use events::{EventFilter, EventRepository, EventRow};
pub use ideas::{IdeaFilter, IdeaRepository, IdeaRow};
pub use inscriptions::{InscriptionRepository, InscriptionRow};
pub use loans::{LoanFilter, LoanItemFilter, LoanItemRepository, LoanItemRow, LoanRepository, LoanRow};
pub use member_relations::{MemberRelationRepository, MemberRelationRow, RelationFilter};
pub use member_statuses::{MemberStatusRepository, MemberStatusRow};
pub use member_tags::{MemberTagRepository, MemberTagRow};
pub use member_tasks::{MemberTaskRepository, MemberTaskRow, TaskFilter};
pub use members::{MemberFilter, MemberRepository, MemberRow};
pub use readonly::ReadOnlyQueryRunner;
pub use tools::{ToolCategoryRepository, ToolCategoryRow, ToolFilter, ToolRepository, ToolRow};
pub use tracking::{
    AlertRepository, AlertRow, Dashboard, MetricFilter, MetricRepository, MetricRow, TriggeredAlert,
};
pub use users::{NewUser, UserChanges, UserRepository, UserRow};
