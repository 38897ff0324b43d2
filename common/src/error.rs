use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("OpenAI error: {0}")]
    OpenAi(#[from] OpenAIError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Transient backend error: {0}")]
    TransientBackend(String),
    #[error("Permanent backend error: {0}")]
    PermanentBackend(String),
    #[error("Structured generation error: {0}")]
    StructuredGeneration(String),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Whether a caller-level retry is worth attempting for this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::TransientBackend(_) | AppError::Database(_) | AppError::Reqwest(_)
        )
    }
}
