//! The `edge` provider's local embedding backend (FastEmbed), the base for
//! [`crate::storage::types::memory_vector::MemoryVector`]'s fixed
//! dimensionality `D` (§9 Open Questions: fixed at 768, matching the
//! default FastEmbed text model).

use std::sync::Arc;

use fastembed::{EmbeddingModel, ModelTrait, TextEmbedding, TextInitOptions};
use tokio::sync::Mutex;

use crate::error::AppError;

pub const EMBEDDING_DIMENSION: usize = 768;

pub struct EmbeddingProvider {
    model: Arc<Mutex<TextEmbedding>>,
}

impl EmbeddingProvider {
    pub fn new() -> Result<Self, AppError> {
        let model_name = EmbeddingModel::BGEBaseENV15;
        let options = TextInitOptions::new(model_name.clone()).with_show_download_progress(true);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| AppError::InternalError(format!("failed to initialize embedding model: {e}")))?;

        let dimension = EmbeddingModel::get_model_info(&model_name)
            .map(|info| info.dim)
            .unwrap_or(EMBEDDING_DIMENSION);
        debug_assert_eq!(dimension, EMBEDDING_DIMENSION);

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }

    pub fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let mut guard = self.model.lock().await;
        let mut embeddings = guard
            .embed(vec![text.to_owned()], None)
            .map_err(|e| AppError::InternalError(format!("failed to generate embedding: {e}")))?;

        embeddings
            .pop()
            .ok_or_else(|| AppError::InternalError("embedding model returned no vectors".into()))
    }

    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut guard = self.model.lock().await;
        guard
            .embed(texts, None)
            .map_err(|e| AppError::InternalError(format!("failed to generate embeddings: {e}")))
    }
}
