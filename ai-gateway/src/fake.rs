//! A canned [`AiGateway`] implementation for tests in crates downstream
//! of `ai-gateway` (ingestion-pipeline, retrieval-pipeline, curator),
//! avoiding real network calls the way `DefaultPipelineServices`'s
//! counterpart fakes keep the teacher's pipeline tests offline.

use async_trait::async_trait;
use common::error::AppError;
use serde_json::Value;
use std::sync::Mutex;

use crate::gateway::AiGateway;
use crate::provider::GenerateOpts;

pub struct FakeAiGateway {
    pub text_response: String,
    pub structured_response: Value,
    pub embedding: Vec<f32>,
    pub rewrite_responses: Mutex<Vec<String>>,
    pub fail: bool,
}

impl FakeAiGateway {
    pub fn new(embedding_dimension: usize) -> Self {
        Self {
            text_response: "consolidated memory text".into(),
            structured_response: Value::Null,
            embedding: vec![0.1; embedding_dimension],
            rewrite_responses: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(1)
        }
    }

    pub fn with_rewrites(embedding_dimension: usize, rewrites: Vec<String>) -> Self {
        let mut rewrites = rewrites;
        rewrites.reverse();
        Self {
            rewrite_responses: Mutex::new(rewrites),
            ..Self::new(embedding_dimension)
        }
    }
}

#[async_trait]
impl AiGateway for FakeAiGateway {
    async fn generate_text(
        &self,
        _prompt: &str,
        _system: &str,
        _opts: &GenerateOpts,
    ) -> Result<String, AppError> {
        if self.fail {
            return Err(AppError::TransientBackend("fake gateway configured to fail".into()));
        }
        Ok(self.text_response.clone())
    }

    async fn generate_structured(
        &self,
        _prompt: &str,
        _schema: Value,
        _opts: &GenerateOpts,
    ) -> Result<Value, AppError> {
        if self.fail {
            return Err(AppError::TransientBackend("fake gateway configured to fail".into()));
        }
        Ok(self.structured_response.clone())
    }

    async fn generate_embeddings(&self, _text: &str, _opts: &GenerateOpts) -> Result<Vec<f32>, AppError> {
        if self.fail {
            return Err(AppError::TransientBackend("fake gateway configured to fail".into()));
        }
        Ok(self.embedding.clone())
    }

    async fn rewrite_question_for_mcp(
        &self,
        query: &str,
        _context: &str,
        _opts: &GenerateOpts,
    ) -> Result<String, AppError> {
        if self.fail {
            return Err(AppError::TransientBackend("fake gateway configured to fail".into()));
        }
        let mut responses = self.rewrite_responses.lock().expect("lock poisoned");
        Ok(responses.pop().unwrap_or_else(|| query.to_string()))
    }
}
