use std::sync::Arc;

use ai_gateway::{AiGateway, GenerateOpts};
use common::error::AppError;
use common::storage::db::SurrealDbClient;
use common::storage::types::memory_vector::MemoryVector;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{instrument, warn};

use crate::types::{RewriteContext, RewrittenResult};

/// Default cap on concurrent rewrite→embed→query chains, independent of
/// how many queries are submitted — the same backpressure idiom as the
/// teacher's `RerankerPool`, sized for a handful of AI provider round
/// trips in flight rather than per-model-instance leases.
const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// AI query rewriting fanned out over `queries` in parallel, each with
/// per-query fallback to the original query on rewrite/embed failure
/// (§4.2.2). A query that fails twice contributes an empty match list
/// rather than aborting its siblings (P6 scenario 6). Order is preserved:
/// `result[i].original_query == queries[i]` for all i (P3).
#[instrument(skip(context, opts, gateway, db))]
pub async fn rewritten_search(
    queries: Vec<String>,
    context: &RewriteContext,
    top_k: usize,
    opts: &GenerateOpts,
    gateway: &dyn AiGateway,
    db: &SurrealDbClient,
) -> Vec<RewrittenResult> {
    let permits = DEFAULT_MAX_CONCURRENCY.min(queries.len()).max(1);
    let semaphore = Arc::new(Semaphore::new(permits));
    let rendered_context = context.render();

    let futures = queries.into_iter().map(|original| {
        let semaphore = Arc::clone(&semaphore);
        let rendered_context = rendered_context.clone();
        async move {
            let _permit = semaphore.acquire().await.expect("semaphore closed");
            run_one(original, &rendered_context, top_k, opts, gateway, db).await
        }
    });

    join_all(futures).await
}

async fn run_one(
    original_query: String,
    rendered_context: &str,
    top_k: usize,
    opts: &GenerateOpts,
    gateway: &dyn AiGateway,
    db: &SurrealDbClient,
) -> RewrittenResult {
    match rewrite_embed_query(&original_query, rendered_context, top_k, opts, gateway, db).await {
        Ok(vector_results) => RewrittenResult {
            original_query: original_query.clone(),
            rewritten_query: vector_results.0,
            vector_results: vector_results.1,
        },
        Err(err) => {
            warn!(query = %original_query, error = %err, "rewrite pipeline failed, falling back to original query");
            match embed_query(&original_query, top_k, opts, gateway, db).await {
                Ok(vector_results) => RewrittenResult {
                    original_query: original_query.clone(),
                    rewritten_query: original_query,
                    vector_results,
                },
                Err(err) => {
                    warn!(query = %original_query, error = %err, "fallback also failed, returning empty match set");
                    RewrittenResult {
                        original_query: original_query.clone(),
                        rewritten_query: original_query,
                        vector_results: Vec::new(),
                    }
                }
            }
        }
    }
}

/// Steps 1-3 of §4.2.2: rewrite, embed, vector query.
async fn rewrite_embed_query(
    original_query: &str,
    rendered_context: &str,
    top_k: usize,
    opts: &GenerateOpts,
    gateway: &dyn AiGateway,
    db: &SurrealDbClient,
) -> Result<(String, Vec<common::storage::types::memory_vector::VectorMatch>), AppError> {
    let rewritten_query = gateway
        .rewrite_question_for_mcp(original_query, rendered_context, opts)
        .await?;
    let vector_results = embed_query(&rewritten_query, top_k, opts, gateway, db).await?;
    Ok((rewritten_query, vector_results))
}

/// Steps 2-3 only, used both on the happy path and as the fallback that
/// embeds `original` directly as `rewritten` per §4.2.2.
async fn embed_query(
    text: &str,
    top_k: usize,
    opts: &GenerateOpts,
    gateway: &dyn AiGateway,
    db: &SurrealDbClient,
) -> Result<Vec<common::storage::types::memory_vector::VectorMatch>, AppError> {
    let embedding = gateway.generate_embeddings(text, opts).await?;
    tokio::time::timeout(opts.timeout, MemoryVector::query(&embedding, top_k, db))
        .await
        .map_err(|_| AppError::TransientBackend("vector store call timed out".into()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_gateway::fake::FakeAiGateway;
    use ai_gateway::AiProvider;
    use common::utils::embedding::EMBEDDING_DIMENSION;

    async fn test_db() -> SurrealDbClient {
        let db = SurrealDbClient::memory("test_ns", &uuid::Uuid::new_v4().to_string())
            .await
            .expect("failed to start in-memory surrealdb");
        db.ensure_initialized().await.expect("failed to init schema");
        db
    }

    #[tokio::test]
    async fn preserves_order_and_uses_original_query_per_index() {
        let db = test_db().await;
        let gateway = FakeAiGateway::new(EMBEDDING_DIMENSION);
        let opts = GenerateOpts {
            provider: AiProvider::Edge,
            ..GenerateOpts::default()
        };
        let queries = vec!["first".to_string(), "second".to_string(), "third".to_string()];

        let results =
            rewritten_search(queries.clone(), &RewriteContext::default(), 5, &opts, &gateway, &db).await;

        assert_eq!(results.len(), 3);
        for (input, result) in queries.iter().zip(results.iter()) {
            assert_eq!(&result.original_query, input);
        }
    }

    #[tokio::test]
    async fn total_failure_yields_empty_matches_without_aborting_siblings() {
        let db = test_db().await;
        let gateway = FakeAiGateway::failing();
        let opts = GenerateOpts {
            provider: AiProvider::Edge,
            ..GenerateOpts::default()
        };
        let queries = vec!["a".to_string(), "b".to_string()];

        let results =
            rewritten_search(queries.clone(), &RewriteContext::default(), 5, &opts, &gateway, &db).await;

        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(result.vector_results.is_empty());
            assert_eq!(result.rewritten_query, result.original_query);
        }
    }
}
