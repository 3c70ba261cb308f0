//! # crm-chatbot
//!
//! Natural-language questions over the CRM database.
//!
//! A hosted model turns the question into one `SELECT`, the guard validates
//! it, the statement runs read-only, and the model narrates the rows. Without
//! an API key the service answers with a fixed demo message.

pub mod error;
pub mod executor;
pub mod guard;
pub mod llm;
pub mod prompt;
pub mod service;

pub use error::{ChatbotError, ExecutionError, GuardError, LlmError};
pub use executor::QueryExecutor;
pub use llm::{model_from_config, LanguageModel, OpenAiClient};
pub use service::{fallback_answer, ChatbotQuery, ChatbotResponse, ChatbotService};
