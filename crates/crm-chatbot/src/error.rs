use thiserror::Error;

/// Hosted model failures
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Model API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Model API returned no answer")]
    EmptyResponse,
}

/// Rejection of a generated statement
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("Generated query is empty")]
    Empty,
    #[error("Forbidden keyword in generated query: {0}")]
    ForbiddenKeyword(&'static str),
    #[error("Only SELECT queries are allowed")]
    NotSelect,
    #[error("Only a single statement is allowed")]
    MultipleStatements,
}

/// Failure while running a validated statement
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ExecutionError(pub String);

/// Failure classes of the query path
#[derive(Debug, Error)]
pub enum ChatbotError {
    #[error("SQL generation failed: {0}")]
    Generation(#[source] LlmError),
    #[error(transparent)]
    Guard(#[from] GuardError),
    #[error("Query execution failed: {0}")]
    Execution(#[from] ExecutionError),
}

impl ChatbotError {
    /// User-facing answer for the failure
    pub fn answer(&self) -> &'static str {
        match self {
            ChatbotError::Generation(_) => "Erreur: impossible de générer une requête pour cette question.",
            ChatbotError::Guard(_) => "Erreur: la requête générée a été refusée pour des raisons de sécurité.",
            ChatbotError::Execution(_) => "Erreur: l'exécution de la requête a échoué.",
        }
    }
}
