//! Read-only execution of ad-hoc SELECT statements
//!
//! Statements run inside a `READ ONLY` transaction with a `statement_timeout`
//! and the transaction is always rolled back. Each row is converted to a JSON
//! object by PostgreSQL itself (`to_json`), so every column type, including
//! NUMERIC, arrays and intervals, arrives as a JSON value keyed by column name.

use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::time::Duration;

/// Runs generated statements without write access
#[derive(Clone)]
pub struct ReadOnlyQueryRunner {
    pool: PgPool,
    statement_timeout: Duration,
}

impl ReadOnlyQueryRunner {
    pub fn new(pool: PgPool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
        }
    }

    /// Execute `sql` and collect every row as a JSON object
    pub async fn fetch_json(&self, sql: &str) -> Result<Vec<Value>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;
        // SET does not take bind parameters
        sqlx::query(&format!(
            "SET LOCAL statement_timeout = {}",
            self.statement_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await?;

        let rows = sqlx::query(&wrap_statement(sql))
            .fetch_all(&mut *tx)
            .await?;
        tx.rollback().await?;

        Ok(rows.iter().map(row_to_json).collect())
    }
}

/// Wrap a SELECT so each result row comes back as a single `json_row` column
///
/// The statement sits on its own lines so a trailing `--` comment cannot
/// swallow the closing parenthesis.
pub fn wrap_statement(sql: &str) -> String {
    format!("SELECT to_json(q) AS json_row FROM (\n{sql}\n) AS q")
}

/// Read the `json_row` column produced by [`wrap_statement`]
pub fn row_to_json(row: &PgRow) -> Value {
    match row.try_get::<Option<Value>, _>("json_row") {
        Ok(value) => value.unwrap_or(Value::Null),
        Err(e) => {
            tracing::debug!(error = %e, "Row decode failed");
            Value::Null
        }
    }
}
