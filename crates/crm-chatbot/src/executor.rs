use async_trait::async_trait;
use crm_db::ReadOnlyQueryRunner;
use serde_json::Value;

use crate::error::ExecutionError;

/// Runs a validated statement and returns rows as JSON objects
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn fetch_json(&self, sql: &str) -> Result<Vec<Value>, ExecutionError>;
}

#[async_trait]
impl QueryExecutor for ReadOnlyQueryRunner {
    async fn fetch_json(&self, sql: &str) -> Result<Vec<Value>, ExecutionError> {
        ReadOnlyQueryRunner::fetch_json(self, sql)
            .await
            .map_err(|e| ExecutionError(e.to_string()))
    }
}
