//! # crm-models
//!
//! Domain enums and write models for the association CRM.
//!
//! Enumerations are stored as `TEXT` columns; every enum here round-trips through
//! `as_str` / `FromStr` and serializes in `snake_case`. Write models (`Create*` /
//! `Update*`) are the JSON request bodies and carry their validation rules.

#[macro_use]
mod macros;

pub mod dev_request;
pub mod event;
pub mod idea;
pub mod loan;
pub mod member;
pub mod member_relation;
pub mod member_status;
pub mod member_tag;
pub mod member_task;
pub mod tool;
pub mod tracking;
pub mod user;

use crm_core::ValidationErrors;
use thiserror::Error;
use validator::Validate;

pub use dev_request::{CreateDevRequest, DevRequestPriority, DevRequestStatus, UpdateDevRequest};
pub use event::{CreateEvent, CreateInscription, EventStatus, InscriptionStatus, UpdateEvent, UpdateInscription};
pub use idea::{CreateIdea, IdeaStatus, UpdateIdea};
pub use loan::{CreateLoan, CreateLoanItem, LoanItemStatus, UpdateLoan, UpdateLoanItem};
pub use member::{normalize_email, CreateMember, UpdateMember};
pub use member_relation::{CreateMemberRelation, RelationType, UpdateMemberRelation};
pub use member_status::{CreateMemberStatus, UpdateMemberStatus};
pub use member_tag::{AssignTag, CreateMemberTag, UpdateMemberTag};
pub use member_task::{CreateMemberTask, TaskStatus, UpdateMemberTask};
pub use tool::{CreateTool, CreateToolCategory, UpdateTool, UpdateToolCategory};
pub use tracking::{AlertSeverity, Comparator, CreateAlert, RecordMetric, UpdateAlert};
pub use user::{CreateUser, LoginRequest, Role, UpdateUser};

/// Error returned when a stored or submitted enum value is unknown
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Run the derive-based rules of a write model and convert to [`ValidationErrors`]
pub trait CheckInput: Validate {
    fn check(&self) -> Result<(), ValidationErrors> {
        self.validate().map_err(ValidationErrors::from)
    }
}

impl<T: Validate> CheckInput for T {}
