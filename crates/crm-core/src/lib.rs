//! # crm-core
//!
//! Core types, traits, and utilities for the association CRM.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - Common error types
//! - Result type alias
//! - Core traits (Entity, UserContext) and key types
//! - Pagination types
//! - Configuration types

pub mod config;
pub mod error;
pub mod pagination;
pub mod result;
pub mod traits;

pub use config::{AppConfig, ConfigError};
pub use error::*;
pub use pagination::*;
pub use result::*;
pub use traits::*;
