//! Natural-language query path
//!
//! Question → generated SQL → guard → read-only execution → narration.
//! Every failure is folded into the returned [`ChatbotResponse`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::ChatbotError;
use crate::executor::QueryExecutor;
use crate::guard;
use crate::llm::LanguageModel;
use crate::prompt;

pub const DISABLED_MESSAGE: &str = "L'assistant de requêtes est en mode démonstration : \
aucune clé d'API n'est configurée. Définissez CHATBOT_API_KEY pour poser des questions sur les données.";

pub const NO_RESULT_MESSAGE: &str = "Aucun résultat trouvé pour cette requête.";

/// Deterministic answer used when narration is unavailable
pub fn fallback_answer(row_count: usize) -> String {
    if row_count == 0 {
        NO_RESULT_MESSAGE.to_string()
    } else {
        format!("Résultat: {} ligne(s) trouvée(s).", row_count)
    }
}

/// Query request body
#[derive(Debug, Clone, Deserialize)]
pub struct ChatbotQuery {
    pub question: String,
    #[serde(default)]
    pub context: Option<String>,
}

/// Query outcome
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ChatbotResponse {
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatbotResponse {
    fn failed(error: ChatbotError, sql: Option<String>) -> Self {
        Self {
            answer: error.answer().to_string(),
            sql,
            data: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// The query assistant
pub struct ChatbotService {
    model: Option<Arc<dyn LanguageModel>>,
    executor: Arc<dyn QueryExecutor>,
    max_prompt_rows: usize,
}

impl ChatbotService {
    pub fn new(
        model: Option<Arc<dyn LanguageModel>>,
        executor: Arc<dyn QueryExecutor>,
        max_prompt_rows: usize,
    ) -> Self {
        Self {
            model,
            executor,
            max_prompt_rows,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.model.is_some()
    }

    /// Answer a question; never fails
    pub async fn answer(&self, query: &ChatbotQuery) -> ChatbotResponse {
        let Some(model) = self.model.as_deref() else {
            tracing::debug!("Chatbot query received in demo mode");
            return ChatbotResponse {
                answer: DISABLED_MESSAGE.to_string(),
                ..Default::default()
            };
        };

        tracing::info!(
            question_len = query.question.chars().count(),
            context = query.context.as_deref().unwrap_or("-"),
            "Chatbot query"
        );

        let raw = match model
            .complete(prompt::SQL_SYSTEM_PROMPT, &prompt::generation_prompt(&query.question))
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "SQL generation failed");
                return ChatbotResponse::failed(ChatbotError::Generation(e), None);
            }
        };

        let sql = guard::strip_code_fences(&raw);
        tracing::info!(sql = %sql, "Generated SQL");

        let statement = match guard::validate(&sql) {
            Ok(statement) => statement,
            Err(e) => {
                tracing::warn!(sql = %sql, reason = %e, "Generated SQL rejected");
                return ChatbotResponse::failed(e.into(), Some(sql));
            }
        };

        let rows = match self.executor.fetch_json(&statement).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(sql = %statement, error = %e, "Generated SQL failed");
                return ChatbotResponse::failed(e.into(), Some(sql));
            }
        };
        tracing::info!(rows = rows.len(), "Generated SQL executed");

        let answer = self.narrate(model, &query.question, &sql, &rows).await;

        ChatbotResponse {
            answer,
            sql: Some(sql),
            data: if rows.is_empty() { None } else { Some(rows) },
            error: None,
        }
    }

    async fn narrate(&self, model: &dyn LanguageModel, question: &str, sql: &str, rows: &[Value]) -> String {
        let prompt = prompt::narration_prompt(question, sql, rows, self.max_prompt_rows);
        match model.complete(prompt::NARRATION_SYSTEM_PROMPT, &prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => fallback_answer(rows.len()),
            Err(e) => {
                tracing::warn!(error = %e, "Narration failed, using fallback answer");
                fallback_answer(rows.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExecutionError, LlmError};
    use crate::executor::MockQueryExecutor;
    use crate::llm::MockLanguageModel;
    use serde_json::json;

    fn is_generation(system: &str) -> bool {
        system == prompt::SQL_SYSTEM_PROMPT
    }

    fn is_narration(system: &str) -> bool {
        system == prompt::NARRATION_SYSTEM_PROMPT
    }

    fn query(question: &str) -> ChatbotQuery {
        ChatbotQuery {
            question: question.to_string(),
            context: None,
        }
    }

    fn model_generating(sql: &'static str) -> MockLanguageModel {
        let mut model = MockLanguageModel::new();
        model
            .expect_complete()
            .withf(|system, _| is_generation(system))
            .times(1)
            .returning(move |_, _| Ok(sql.to_string()));
        model
    }

    fn failing_narration(model: &mut MockLanguageModel) {
        model
            .expect_complete()
            .withf(|system, _| is_narration(system))
            .times(1)
            .returning(|_, _| Err(LlmError::EmptyResponse));
    }

    fn unused_executor() -> MockQueryExecutor {
        let mut executor = MockQueryExecutor::new();
        executor.expect_fetch_json().never();
        executor
    }

    fn service(model: MockLanguageModel, executor: MockQueryExecutor) -> ChatbotService {
        ChatbotService::new(Some(Arc::new(model)), Arc::new(executor), 50)
    }

    #[tokio::test]
    async fn test_non_select_is_rejected_without_execution() {
        let model = model_generating("SHOW search_path");
        let response = service(model, unused_executor()).answer(&query("q")).await;

        assert!(!response.error.as_deref().unwrap_or_default().is_empty());
        assert!(response.data.is_none());
        assert_eq!(response.sql.as_deref(), Some("SHOW search_path"));
        assert!(response.answer.starts_with("Erreur"));
    }

    #[tokio::test]
    async fn test_denylisted_keyword_anywhere_is_rejected() {
        let model = model_generating("SELECT * FROM members; DROP TABLE members");
        let response = service(model, unused_executor()).answer(&query("q")).await;

        let error = response.error.unwrap();
        assert!(error.contains("DROP"), "{}", error);
        assert!(response.data.is_none());
    }

    #[tokio::test]
    async fn test_fenced_statement_is_unwrapped() {
        let mut model = model_generating("```sql\nSELECT COUNT(*) AS total FROM members\n```");
        model
            .expect_complete()
            .withf(|system, _| is_narration(system))
            .returning(|_, _| Ok("Il y a 12 membres.".to_string()));

        let mut executor = MockQueryExecutor::new();
        executor
            .expect_fetch_json()
            .withf(|sql| sql == "SELECT COUNT(*) AS total FROM members")
            .times(1)
            .returning(|_| Ok(vec![json!({ "total": 12 })]));

        let response = service(model, executor).answer(&query("Combien de membres ?")).await;

        assert_eq!(response.sql.as_deref(), Some("SELECT COUNT(*) AS total FROM members"));
        assert_eq!(response.answer, "Il y a 12 membres.");
        assert_eq!(response.data, Some(vec![json!({ "total": 12 })]));
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_zero_rows_with_failed_narration() {
        let mut model = model_generating("SELECT email FROM members WHERE 1 = 0");
        failing_narration(&mut model);

        let mut executor = MockQueryExecutor::new();
        executor.expect_fetch_json().times(1).returning(|_| Ok(vec![]));

        let response = service(model, executor).answer(&query("q")).await;

        assert!(response.data.is_none());
        assert!(response.error.is_none());
        assert_eq!(response.answer, "Aucun résultat trouvé pour cette requête.");
    }

    #[tokio::test]
    async fn test_rows_with_failed_narration() {
        let mut model = model_generating("SELECT email FROM members");
        failing_narration(&mut model);

        let mut executor = MockQueryExecutor::new();
        executor.expect_fetch_json().times(1).returning(|_| {
            Ok(vec![
                json!({ "email": "a@example.org" }),
                json!({ "email": "b@example.org" }),
                json!({ "email": "c@example.org" }),
            ])
        });

        let response = service(model, executor).answer(&query("q")).await;

        assert_eq!(response.answer, "Résultat: 3 ligne(s) trouvée(s).");
        assert_eq!(response.data.map(|rows| rows.len()), Some(3));
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_blank_narration_uses_fallback() {
        let mut model = model_generating("SELECT 1 AS one");
        model
            .expect_complete()
            .withf(|system, _| is_narration(system))
            .returning(|_, _| Ok("   ".to_string()));

        let mut executor = MockQueryExecutor::new();
        executor
            .expect_fetch_json()
            .returning(|_| Ok(vec![json!({ "one": 1 })]));

        let response = service(model, executor).answer(&query("q")).await;
        assert_eq!(response.answer, "Résultat: 1 ligne(s) trouvée(s).");
    }

    #[tokio::test]
    async fn test_demo_mode_makes_no_calls() {
        let service = ChatbotService::new(None, Arc::new(unused_executor()), 50);
        assert!(!service.is_enabled());

        let response = service.answer(&query("Combien de membres ?")).await;

        assert_eq!(response.answer, DISABLED_MESSAGE);
        assert!(response.sql.is_none());
        assert!(response.data.is_none());
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_generation_failure() {
        let mut model = MockLanguageModel::new();
        model.expect_complete().times(1).returning(|_, _| {
            Err(LlmError::Status {
                status: 401,
                body: "bad key".into(),
            })
        });

        let response = service(model, unused_executor()).answer(&query("q")).await;

        assert!(response.error.unwrap().contains("401"));
        assert!(response.sql.is_none());
        assert!(response.data.is_none());
    }

    #[tokio::test]
    async fn test_execution_failure() {
        let model = model_generating("SELECT nope FROM members");

        let mut executor = MockQueryExecutor::new();
        executor
            .expect_fetch_json()
            .times(1)
            .returning(|_| Err(ExecutionError("column \"nope\" does not exist".into())));

        let response = service(model, executor).answer(&query("q")).await;

        assert!(response.error.unwrap().contains("nope"));
        assert_eq!(response.sql.as_deref(), Some("SELECT nope FROM members"));
        assert!(response.data.is_none());
    }

    #[tokio::test]
    async fn test_trailing_semicolon_is_not_executed() {
        let mut model = model_generating("SELECT 1 AS one;");
        failing_narration(&mut model);

        let mut executor = MockQueryExecutor::new();
        executor
            .expect_fetch_json()
            .withf(|sql| sql == "SELECT 1 AS one")
            .times(1)
            .returning(|_| Ok(vec![json!({ "one": 1 })]));

        let response = service(model, executor).answer(&query("q")).await;
        assert_eq!(response.sql.as_deref(), Some("SELECT 1 AS one;"));
    }

    #[tokio::test]
    async fn test_narration_prompt_is_bounded() {
        let mut model = model_generating("SELECT n FROM t");
        model
            .expect_complete()
            .withf(|system, prompt| {
                is_narration(system) && prompt.contains("(10 ligne(s))") && !prompt.contains(r#"{"n":2}"#)
            })
            .times(1)
            .returning(|_, _| Ok("Dix lignes.".to_string()));

        let mut executor = MockQueryExecutor::new();
        executor
            .expect_fetch_json()
            .returning(|_| Ok((0..10).map(|n| json!({ "n": n })).collect()));

        let service = ChatbotService::new(Some(Arc::new(model)), Arc::new(executor), 2);
        let response = service.answer(&query("q")).await;

        assert_eq!(response.answer, "Dix lignes.");
        assert_eq!(response.data.map(|rows| rows.len()), Some(10));
    }

    #[test]
    fn test_response_serialization_omits_absent_fields() {
        let response = ChatbotResponse {
            answer: NO_RESULT_MESSAGE.to_string(),
            sql: Some("SELECT 1".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({ "answer": NO_RESULT_MESSAGE, "sql": "SELECT 1" }));
    }
}
